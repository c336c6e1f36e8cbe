//! HTTP client for the Endolla open-data feed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;

use super::error::FetchError;
use crate::config::FeedConfig;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};

/// Source of raw feed payloads
///
/// The coordinator only depends on this trait, so tests can substitute a
/// scripted source for the network.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Retrieve the full feed document as bytes
    async fn fetch(&self) -> std::result::Result<Vec<u8>, FetchError>;

    /// Human readable location of the feed, used in logs
    fn describe(&self) -> String {
        "feed".to_string()
    }
}

/// reqwest-backed [`FeedSource`] for the public Endolla endpoint
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
    logger: StructuredLogger,
}

impl FeedClient {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let timeout = config.timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            url: config.url.clone(),
            timeout,
            logger: get_logger("feed"),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                after: self.timeout,
            }
        } else {
            FetchError::Transport {
                message: err.to_string(),
            }
        }
    }

    async fn request(&self) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch(&self) -> std::result::Result<Vec<u8>, FetchError> {
        self.logger.debug(&format!("Fetching {}", self.url));

        // reqwest's own timeout does not cover every await point of a slow body
        match tokio::time::timeout(self.timeout, self.request()).await {
            Ok(Ok(body)) => {
                self.logger
                    .trace(&format!("Received {} bytes from feed", body.len()));
                Ok(body)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(FetchError::Timeout {
                after: self.timeout,
            }),
        }
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_uses_configured_url_and_timeout() {
        let config = FeedConfig {
            url: "http://127.0.0.1:9/feed.json".to_string(),
            timeout_secs: 3,
            ..FeedConfig::default()
        };
        let client = FeedClient::new(&config).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:9/feed.json");
        assert_eq!(client.timeout(), Duration::from_secs(3));
        assert_eq!(client.describe(), "http://127.0.0.1:9/feed.json");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_or_timeout_error() {
        let config = FeedConfig {
            url: "http://127.0.0.1:9/feed.json".to_string(),
            timeout_secs: 2,
            ..FeedConfig::default()
        };
        let client = FeedClient::new(&config).unwrap();
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Transport { .. } | FetchError::Timeout { .. }
        ));
    }
}
