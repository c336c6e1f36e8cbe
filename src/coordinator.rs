//! Per-station update coordinator
//!
//! One [`StationCoordinator`] owns the last-known-good snapshot of one
//! station. It is the only writer of that snapshot: each refresh either
//! publishes a whole new `Arc<StationSnapshot>` or leaves the previous one in
//! place. Readers go through [`StationCoordinator::current_snapshot`] or a
//! [`watch`] subscription and never observe a partial update.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::error::{EndollaError, Result};
use crate::feed::{FeedSource, ParseOutcome, StationSnapshot, parse};
use crate::logging::{StructuredLogger, get_station_logger};

/// Outcome of one fetch + parse cycle, before it is applied
#[derive(Debug)]
pub enum PollResult {
    /// The station was found; its snapshot replaces the stored one
    Success(StationSnapshot),
    /// The feed is valid but does not list the station
    NotFound,
    /// Fetch or decode failed; the stored snapshot is kept.
    /// Always [`EndollaError::UpdateFailed`] carrying the typed cause.
    Failure(EndollaError),
}

/// Health of the refresh cycle, for observability only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorStatus {
    pub station_id: String,
    /// False after a failed cycle until the next successful one
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub total_refreshes: u64,
    pub failed_refreshes: u64,
    /// At least one cycle has completed without a fault
    pub initialized: bool,
    pub update_interval_secs: u64,
}

impl CoordinatorStatus {
    fn new(station_id: &str, update_interval: Duration) -> Self {
        Self {
            station_id: station_id.to_string(),
            last_update_success: true,
            last_error: None,
            last_attempt_at: None,
            last_success_at: None,
            total_refreshes: 0,
            failed_refreshes: 0,
            initialized: false,
            update_interval_secs: update_interval.as_secs(),
        }
    }
}

/// Fixed-interval refresher and owner of one station's snapshot
pub struct StationCoordinator {
    station_id: String,
    source: Arc<dyn FeedSource>,
    update_interval: Duration,
    snapshot_tx: watch::Sender<Arc<StationSnapshot>>,
    status_tx: watch::Sender<CoordinatorStatus>,
    // Serializes manual and periodic refreshes
    refresh_lock: Mutex<()>,
    closed: AtomicBool,
    logger: StructuredLogger,
}

impl std::fmt::Debug for StationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationCoordinator")
            .field("station_id", &self.station_id)
            .field("source", &self.source.describe())
            .field("update_interval", &self.update_interval)
            .finish()
    }
}

impl StationCoordinator {
    pub fn new(
        station_id: impl Into<String>,
        source: Arc<dyn FeedSource>,
        update_interval: Duration,
    ) -> Self {
        let station_id = station_id.into();
        let (snapshot_tx, _) = watch::channel(Arc::new(StationSnapshot::empty()));
        let (status_tx, _) = watch::channel(CoordinatorStatus::new(&station_id, update_interval));
        let logger = get_station_logger("coordinator", &station_id);

        Self {
            station_id,
            source,
            update_interval,
            snapshot_tx,
            status_tx,
            refresh_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            logger,
        }
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Fetch and parse once without touching any stored state
    pub async fn poll_once(&self) -> PollResult {
        let bytes = match self.source.fetch().await {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = format!("Error fetching data: {}", e);
                return PollResult::Failure(EndollaError::update_failed_from(message, e.into()));
            }
        };

        match parse(&bytes, &self.station_id) {
            Ok(snapshot) => PollResult::Success(snapshot),
            Err(ParseOutcome::NotFound) => PollResult::NotFound,
            Err(ParseOutcome::Malformed(cause)) => {
                let message = format!("Error parsing JSON: {}", cause);
                let source = EndollaError::from(ParseOutcome::Malformed(cause));
                PollResult::Failure(EndollaError::update_failed_from(message, source))
            }
        }
    }

    /// Stop accepting refreshes; one still fetching discards its result
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(EndollaError::not_found(format!(
                "Station {} is no longer tracked",
                self.station_id
            )));
        }
        Ok(())
    }

    /// Run one refresh cycle and apply its outcome
    ///
    /// A failed cycle returns [`EndollaError::UpdateFailed`] and leaves the
    /// published snapshot untouched. A station missing from the feed is not a
    /// failure: the empty snapshot is published instead.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.ensure_open()?;
        let attempted_at = Utc::now();
        let result = self.poll_once().await;
        // Closed while the fetch was in flight
        self.ensure_open()?;
        self.apply(result, attempted_at)
    }

    fn apply(&self, result: PollResult, attempted_at: DateTime<Utc>) -> Result<()> {
        match result {
            PollResult::Success(snapshot) => {
                self.logger.debug(&format!(
                    "Refreshed station data, {} port(s)",
                    snapshot.ports().len()
                ));
                self.snapshot_tx.send_replace(Arc::new(snapshot));
                self.record_success(attempted_at);
                Ok(())
            }
            PollResult::NotFound => {
                self.logger.warn(&format!(
                    "Station {} not found in Endolla data",
                    self.station_id
                ));
                self.snapshot_tx
                    .send_replace(Arc::new(StationSnapshot::empty()));
                self.record_success(attempted_at);
                Ok(())
            }
            PollResult::Failure(err) => {
                let message = match &err {
                    EndollaError::UpdateFailed { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                self.logger.error(&message);
                self.status_tx.send_modify(|status| {
                    status.last_update_success = false;
                    status.last_error = Some(message.clone());
                    status.last_attempt_at = Some(attempted_at);
                    status.total_refreshes = status.total_refreshes.saturating_add(1);
                    status.failed_refreshes = status.failed_refreshes.saturating_add(1);
                });
                Err(err)
            }
        }
    }

    fn record_success(&self, attempted_at: DateTime<Utc>) {
        self.status_tx.send_modify(|status| {
            status.last_update_success = true;
            status.last_error = None;
            status.last_attempt_at = Some(attempted_at);
            status.last_success_at = Some(attempted_at);
            status.total_refreshes = status.total_refreshes.saturating_add(1);
            status.initialized = true;
        });
    }

    /// Initial refresh awaited during entry setup
    ///
    /// Completes after exactly one attempt. A failure is logged and recorded
    /// in [`Self::status`]; the entry still starts with the empty snapshot.
    pub async fn first_refresh(&self) -> Result<()> {
        let result = self.refresh().await;
        if let Err(ref e) = result {
            self.logger
                .warn(&format!("Initial refresh failed, will retry on schedule: {}", e));
        }
        result
    }

    /// Periodic refresh loop, until `shutdown` flips to true or its sender drops
    ///
    /// The first tick fires one interval after the call. A refresh that is
    /// still in flight when shutdown arrives is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        let mut ticker = interval_at(Instant::now() + self.update_interval, self.update_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.logger.info(&format!(
            "Polling every {}s",
            self.update_interval.as_secs()
        ));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        // Failures are recorded in the status; keep polling
                        _ = self.refresh() => {}
                        _ = shutdown.changed() => break,
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        self.logger.info("Polling stopped");
    }

    /// Last published snapshot; never triggers a fetch
    pub fn current_snapshot(&self) -> Arc<StationSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver notified after each published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<StationSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.status_tx.borrow().clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.status_tx.borrow().last_update_success
    }

    pub fn is_initialized(&self) -> bool {
        self.status_tx.borrow().initialized
    }
}
