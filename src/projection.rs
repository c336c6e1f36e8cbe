//! Per-port views over a station snapshot
//!
//! A [`PortProjection`] holds no data of its own. Every read goes to the
//! coordinator's current snapshot, so a port that disappears from the feed
//! reports an absent status instead of a stale one.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::coordinator::StationCoordinator;
use crate::feed::{PortIcon, PortStatus, StationSnapshot};
use crate::logging::get_station_logger;

pub const MANUFACTURER: &str = "Endolla Barcelona";

/// Device grouping shared by all ports of a station
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Grouping key, the station id
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
}

impl DeviceInfo {
    pub fn for_station(station_id: &str) -> Self {
        Self {
            identifier: station_id.to_string(),
            name: format!("Endolla Station {}", station_id),
            manufacturer: MANUFACTURER.to_string(),
        }
    }
}

/// Everything an entity consumer needs about one port, read from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortState {
    pub unique_id: String,
    pub name: String,
    pub station_id: String,
    pub port_id: String,
    /// `None` when the port is not in the current snapshot
    pub status: Option<String>,
    pub icon: &'static str,
    pub last_updated: String,
    pub attributes: Map<String, Value>,
    /// Whether the last refresh cycle succeeded
    pub available: bool,
    pub device: DeviceInfo,
}

/// Read-only view of one port of one station
#[derive(Debug, Clone)]
pub struct PortProjection {
    station_id: String,
    port_id: String,
    coordinator: Arc<StationCoordinator>,
}

impl PortProjection {
    pub fn new(coordinator: Arc<StationCoordinator>, port_id: impl Into<String>) -> Self {
        Self {
            station_id: coordinator.station_id().to_string(),
            port_id: port_id.into(),
            coordinator,
        }
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn port_id(&self) -> &str {
        &self.port_id
    }

    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.station_id, self.port_id)
    }

    pub fn name(&self) -> String {
        format!("Endolla {} Port {}", self.station_id, self.port_id)
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::for_station(&self.station_id)
    }

    /// Current status string of the port, `None` when it is absent
    pub fn status(&self) -> Option<String> {
        status_in(&self.coordinator.current_snapshot(), &self.port_id)
    }

    pub fn port_status(&self) -> Option<PortStatus> {
        self.status().as_deref().map(PortStatus::from_label)
    }

    /// Feed-native timestamp of the port, empty when unknown
    pub fn last_updated(&self) -> String {
        self.coordinator
            .current_snapshot()
            .port(&self.port_id)
            .map(|port| port.last_updated().to_string())
            .unwrap_or_default()
    }

    pub fn icon(&self) -> PortIcon {
        PortIcon::for_status(self.port_status().as_ref())
    }

    /// Full entity state evaluated against a single snapshot
    pub fn state(&self) -> PortState {
        self.state_from(&self.coordinator.current_snapshot())
    }

    /// Entity state against a given snapshot, e.g. one received from a subscription
    pub fn state_from(&self, snapshot: &StationSnapshot) -> PortState {
        let port = snapshot.port(&self.port_id);
        let status = status_in(snapshot, &self.port_id);
        let parsed = status.as_deref().map(PortStatus::from_label);
        let last_updated = port
            .map(|p| p.last_updated().to_string())
            .unwrap_or_default();

        let mut attributes = Map::new();
        if port.is_some() {
            attributes.insert(
                "last_updated".to_string(),
                Value::String(last_updated.clone()),
            );
        }

        PortState {
            unique_id: self.unique_id(),
            name: self.name(),
            station_id: self.station_id.clone(),
            port_id: self.port_id.clone(),
            icon: PortIcon::for_status(parsed.as_ref()).as_str(),
            status,
            last_updated,
            attributes,
            available: self.coordinator.last_update_success(),
            device: self.device_info(),
        }
    }
}

fn status_in(snapshot: &StationSnapshot, port_id: &str) -> Option<String> {
    snapshot
        .port(port_id)
        .map(|port| port.current_status().to_string())
}

/// Port ids to project, in document order
///
/// Duplicates keep their first occurrence; ports without an id are skipped.
pub fn discover_ports(station_id: &str, snapshot: &StationSnapshot) -> Vec<String> {
    let logger = get_station_logger("projection", station_id);

    if snapshot.is_empty() {
        logger.warn(&format!(
            "No station data yet for station {}; no ports will be created",
            station_id
        ));
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut ports = Vec::new();
    for port in snapshot.ports() {
        if port.id.is_empty() {
            logger.warn("Skipping port without an id");
            continue;
        }
        if seen.insert(port.id.as_str()) {
            ports.push(port.id.clone());
        }
    }
    ports
}

/// One projection per port of the coordinator's current snapshot
pub fn build_projections(coordinator: &Arc<StationCoordinator>) -> Vec<PortProjection> {
    let snapshot = coordinator.current_snapshot();
    discover_ports(coordinator.station_id(), &snapshot)
        .into_iter()
        .map(|port_id| PortProjection::new(coordinator.clone(), port_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn discovery_dedupes_and_skips_empty_ids() {
        let snapshot = StationSnapshot::from_raw(json!({
            "id": "S1",
            "ports": [{"id": "b"}, {"id": ""}, {"id": "a"}, {"id": "b"}, {}]
        }))
        .unwrap();
        assert_eq!(discover_ports("S1", &snapshot), vec!["b", "a"]);
    }

    #[test]
    fn discovery_on_empty_snapshot_yields_nothing() {
        assert!(discover_ports("S1", &StationSnapshot::empty()).is_empty());
    }

    #[test]
    fn station_without_ports_yields_nothing() {
        let snapshot = StationSnapshot::from_raw(json!({"id": "S1", "ports": []})).unwrap();
        assert!(discover_ports("S1", &snapshot).is_empty());
    }

    #[test]
    fn device_info_names_station() {
        let info = DeviceInfo::for_station("5091");
        assert_eq!(info.identifier, "5091");
        assert_eq!(info.name, "Endolla Station 5091");
        assert_eq!(info.manufacturer, "Endolla Barcelona");
    }
}
