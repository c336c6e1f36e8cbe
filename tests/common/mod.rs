#![allow(dead_code)]

use async_trait::async_trait;
use endolla::feed::{FeedSource, FetchError};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory feed whose answer can be swapped between refreshes
pub struct MockFeed {
    response: Mutex<Result<Vec<u8>, FetchError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockFeed {
    pub fn new(body: Value) -> Arc<Self> {
        Self::build(body, None)
    }

    pub fn slow(body: Value, delay: Duration) -> Arc<Self> {
        Self::build(body, Some(delay))
    }

    fn build(body: Value, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(serde_json::to_vec(&body).unwrap())),
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn set_body(&self, body: Value) {
        *self.response.lock().unwrap() = Ok(serde_json::to_vec(&body).unwrap());
    }

    pub fn set_bytes(&self, bytes: &[u8]) {
        *self.response.lock().unwrap() = Ok(bytes.to_vec());
    }

    pub fn set_error(&self, err: FetchError) {
        *self.response.lock().unwrap() = Err(err);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for MockFeed {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.response.lock().unwrap().clone()
    }
}

/// Feed document listing one station with the given `ports` array
pub fn station_feed(station_id: &str, ports: Value) -> Value {
    json!({
        "locations": [
            {"id": "LOC-0", "stations": [{"id": "OTHER", "ports": []}]},
            {"id": "LOC-1", "stations": [{"id": station_id, "ports": ports}]}
        ]
    })
}

/// Port object with a single-entry status history
pub fn port(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "port_status": [{"status": status, "changed": "2024-05-01T10:00:00"}],
        "last_updated": "2024-05-01T10:05:00"
    })
}
