//! Endolla open-data feed
//!
//! Fetching the network-wide JSON snapshot and extracting the record of one
//! station from it.

pub mod client;
pub mod error;
pub mod parser;
pub mod types;

pub use client::{FeedClient, FeedSource};
pub use error::{FetchError, ParseOutcome};
pub use parser::parse;
pub use types::{PortIcon, PortRecord, PortStatus, StationSnapshot, StatusEntry};
