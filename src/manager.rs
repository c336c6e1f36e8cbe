//! Registry of configured station entries
//!
//! Each entry owns one coordinator, its periodic task and the projections
//! created for the ports seen at setup. Entries are inserted on setup and
//! removed on unload; nothing else holds them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{FeedConfig, StationConfig};
use crate::coordinator::{CoordinatorStatus, StationCoordinator};
use crate::error::{EndollaError, Result};
use crate::feed::{FeedClient, FeedSource};
use crate::logging::{StructuredLogger, get_logger};
use crate::projection::{PortProjection, PortState, build_projections};

/// Opaque key of a configured entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Running state of one entry
#[derive(Debug)]
pub struct StationRuntime {
    config: StationConfig,
    coordinator: Arc<StationCoordinator>,
    projections: Vec<PortProjection>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StationRuntime {
    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<StationCoordinator> {
        &self.coordinator
    }

    pub fn projections(&self) -> &[PortProjection] {
        &self.projections
    }

    async fn stop(self) {
        // A manual refresh still fetching discards its result
        self.coordinator.close();
        let _ = self.shutdown_tx.send(true);
        self.task.abort();
        // Cancelled or finished, either way no periodic refresh runs past this point
        let _ = self.task.await;
    }
}

/// Listing row for one entry
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub entry_id: EntryId,
    pub station_id: String,
    pub title: String,
    pub ports: Vec<String>,
    pub status: CoordinatorStatus,
}

/// Builds runtimes without holding the registry
///
/// Setup awaits a full fetch; the web layer launches through a cloned
/// launcher so the registry lock is not held across it.
#[derive(Clone)]
pub struct EntryLauncher {
    source: Arc<dyn FeedSource>,
    update_interval: Duration,
}

impl EntryLauncher {
    pub fn new(source: Arc<dyn FeedSource>, update_interval: Duration) -> Self {
        Self {
            source,
            update_interval,
        }
    }

    /// Create the coordinator, await its first refresh, project the ports
    /// found and start the periodic task
    pub async fn launch(&self, station: StationConfig) -> Result<StationRuntime> {
        station.validate()?;

        let coordinator = Arc::new(StationCoordinator::new(
            station.station_id.clone(),
            self.source.clone(),
            self.update_interval,
        ));
        // Failure is recorded on the coordinator; setup proceeds with no ports
        let _ = coordinator.first_refresh().await;

        let projections = build_projections(&coordinator);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.run(shutdown_rx).await })
        };

        Ok(StationRuntime {
            config: station,
            coordinator,
            projections,
            shutdown_tx,
            task,
        })
    }
}

/// Process-wide map of entry id to station runtime
pub struct StationManager {
    launcher: EntryLauncher,
    entries: HashMap<EntryId, StationRuntime>,
    logger: StructuredLogger,
}

impl StationManager {
    /// Manager fetching from the configured feed over HTTP
    pub fn new(feed: &FeedConfig) -> Result<Self> {
        let client = FeedClient::new(feed)?;
        Ok(Self::with_source(Arc::new(client), feed.update_interval()))
    }

    pub fn with_source(source: Arc<dyn FeedSource>, update_interval: Duration) -> Self {
        Self {
            launcher: EntryLauncher::new(source, update_interval),
            entries: HashMap::new(),
            logger: get_logger("manager"),
        }
    }

    pub fn launcher(&self) -> EntryLauncher {
        self.launcher.clone()
    }

    /// Whether an entry already tracks `station_id`
    pub fn is_configured(&self, station_id: &str) -> bool {
        self.entries
            .values()
            .any(|runtime| runtime.config.station_id == station_id)
    }

    fn ensure_not_configured(&self, station_id: &str) -> Result<()> {
        if self.is_configured(station_id) {
            return Err(EndollaError::validation(
                "station_id".to_string(),
                format!("Station {} is already configured", station_id),
            ));
        }
        Ok(())
    }

    /// Set up a new entry and register it
    pub async fn setup_entry(&mut self, station: StationConfig) -> Result<EntryId> {
        self.ensure_not_configured(&station.station_id)?;
        let runtime = self.launcher.launch(station).await?;
        self.insert(runtime).await
    }

    /// Register a runtime built by an [`EntryLauncher`]
    ///
    /// A runtime for a station that got configured in the meantime is
    /// stopped and rejected.
    pub async fn insert(&mut self, runtime: StationRuntime) -> Result<EntryId> {
        if let Err(e) = self.ensure_not_configured(&runtime.config.station_id) {
            runtime.stop().await;
            return Err(e);
        }

        let entry_id = EntryId::generate();
        self.logger.info(&format!(
            "Set up entry {} for station {} with {} port(s)",
            entry_id,
            runtime.config.station_id,
            runtime.projections.len()
        ));
        self.entries.insert(entry_id.clone(), runtime);
        Ok(entry_id)
    }

    /// Stop and remove an entry; false when it is unknown
    pub async fn unload_entry(&mut self, entry_id: &EntryId) -> bool {
        match self.entries.remove(entry_id) {
            Some(runtime) => {
                let station_id = runtime.config.station_id.clone();
                runtime.stop().await;
                self.logger
                    .info(&format!("Unloaded entry {} (station {})", entry_id, station_id));
                true
            }
            None => false,
        }
    }

    pub async fn shutdown_all(&mut self) {
        let ids: Vec<EntryId> = self.entries.keys().cloned().collect();
        for id in ids {
            self.unload_entry(&id).await;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, entry_id: &EntryId) -> Option<&StationRuntime> {
        self.entries.get(entry_id)
    }

    pub fn coordinator(&self, entry_id: &EntryId) -> Option<Arc<StationCoordinator>> {
        self.entries
            .get(entry_id)
            .map(|runtime| runtime.coordinator.clone())
    }

    /// Entry listing, ordered by station id
    pub fn entries(&self) -> Vec<EntrySummary> {
        let mut summaries: Vec<EntrySummary> = self
            .entries
            .iter()
            .map(|(entry_id, runtime)| EntrySummary {
                entry_id: entry_id.clone(),
                station_id: runtime.config.station_id.clone(),
                title: runtime.config.title(),
                ports: runtime
                    .projections
                    .iter()
                    .map(|p| p.port_id().to_string())
                    .collect(),
                status: runtime.coordinator.status(),
            })
            .collect();
        summaries.sort_by(|a, b| a.station_id.cmp(&b.station_id));
        summaries
    }

    /// States of every projected port across all entries
    pub fn entities(&self) -> Vec<PortState> {
        let mut states: Vec<PortState> = self
            .entries
            .values()
            .flat_map(|runtime| runtime.projections.iter().map(PortProjection::state))
            .collect();
        states.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        states
    }

    pub fn entity(&self, unique_id: &str) -> Option<PortState> {
        self.entries
            .values()
            .flat_map(|runtime| runtime.projections.iter())
            .find(|projection| projection.unique_id() == unique_id)
            .map(PortProjection::state)
    }
}

impl std::fmt::Debug for StationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationManager")
            .field("entries", &self.entries.len())
            .finish()
    }
}
