//! # Endolla - charging port status for Barcelona's public EV network
//!
//! Polls the Endolla open-data feed and exposes the live status of every
//! charging port of the configured stations as individually addressable
//! entities.
//!
//! ## Architecture
//!
//! - `feed`: HTTP client, typed records and the station extractor
//! - `coordinator`: fixed-interval refresh and last-known-good snapshot
//! - `projection`: per-port status, timestamp and icon views
//! - `manager`: registry of configured station entries
//! - `web`: HTTP/JSON API over the registry
//! - `config`: configuration management and validation
//! - `logging`: structured logging and tracing
//! - `error`: crate-wide error type

pub mod config;
pub mod coordinator;
pub mod error;
pub mod feed;
pub mod logging;
pub mod manager;
pub mod projection;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{CoordinatorStatus, PollResult, StationCoordinator};
pub use error::{EndollaError, Result};
pub use manager::{EntryId, StationManager};
pub use projection::{PortProjection, PortState};
