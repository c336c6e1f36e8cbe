//! Typed view of the Endolla feed records.
//!
//! Optional sub-fields are resolved once here, at decode time: a missing
//! `ports` or `port_status` becomes an empty list, a missing `status` or
//! `last_updated` becomes `None`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::logging::get_logger;

/// Status reported for a port whose history carries no usable entry
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

/// Accept strings, numbers and booleans as text; anything else is treated as absent
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

/// Status history; anything other than an array reads as empty
///
/// Entries keep their position, so a non-object entry becomes an entry
/// without a status rather than shifting the current one.
fn lenient_history<'de, D>(deserializer: D) -> Result<Vec<StatusEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(entries)) => entries
            .into_iter()
            .map(|entry| StatusEntry::deserialize(entry).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

/// One element of a port's `port_status` history
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StatusEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,

    /// Timestamp-adjacent and other fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One charging port of a station
///
/// The feed orders `port_status` newest first: element 0 is the current
/// status. Read it through [`PortRecord::current_status`] only.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PortRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,

    #[serde(rename = "port_status", default, deserialize_with = "lenient_history")]
    pub status_history: Vec<StatusEntry>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub last_updated: Option<String>,
}

impl PortRecord {
    /// Current status string, `"UNKNOWN"` when the history has nothing to say
    pub fn current_status(&self) -> &str {
        self.status_history
            .first()
            .and_then(|entry| entry.status.as_deref())
            .unwrap_or(UNKNOWN_STATUS)
    }

    /// Feed-native last update timestamp, empty when absent
    pub fn last_updated(&self) -> &str {
        self.last_updated.as_deref().unwrap_or("")
    }
}

/// The record of one station as of one fetch
///
/// `raw` is the station object exactly as the feed sent it; `ports` is the
/// typed view decoded from it. Serializes as `raw`.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSnapshot {
    raw: Value,
    ports: Vec<PortRecord>,
}

impl StationSnapshot {
    /// The `{}` snapshot published while the station is absent from the feed
    pub fn empty() -> Self {
        Self {
            raw: Value::Object(Map::new()),
            ports: Vec::new(),
        }
    }

    /// Decode the typed view of a raw station object
    ///
    /// Ports are decoded one by one: an element that is not an object is
    /// skipped with a warning and does not affect its siblings. Only a
    /// `ports` value that is neither absent, null nor an array is an error.
    pub fn from_raw(raw: Value) -> Result<Self, serde_json::Error> {
        let ports = match raw.get("ports") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(elements)) => decode_ports(elements),
            Some(other) => {
                return Err(serde::de::Error::custom(format!(
                    "ports: expected an array, found {}",
                    kind_of(other)
                )));
            }
        };
        Ok(Self { raw, ports })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn station_id(&self) -> Option<&str> {
        self.raw.get("id").and_then(Value::as_str)
    }

    pub fn ports(&self) -> &[PortRecord] {
        &self.ports
    }

    /// First port whose id equals `port_id`
    pub fn port(&self, port_id: &str) -> Option<&PortRecord> {
        self.ports.iter().find(|port| port.id == port_id)
    }

    /// True for `{}` or any station object without fields
    pub fn is_empty(&self) -> bool {
        match &self.raw {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }
}

fn decode_ports(elements: &[Value]) -> Vec<PortRecord> {
    let mut ports = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        if !element.is_object() {
            get_logger("feed").warn(&format!(
                "Skipping port #{} of kind {}",
                index,
                kind_of(element)
            ));
            continue;
        }
        match PortRecord::deserialize(element) {
            Ok(port) => ports.push(port),
            Err(e) => get_logger("feed").warn(&format!("Skipping port #{}: {}", index, e)),
        }
    }
    ports
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Default for StationSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for StationSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// Port status as published by the feed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortStatus {
    Available,
    InUse,
    OutOfOrder,
    Unknown,
    /// Any label this crate does not interpret
    Other(String),
}

impl PortStatus {
    /// Exact, case-sensitive match on the feed labels
    pub fn from_label(label: &str) -> Self {
        match label {
            "AVAILABLE" => Self::Available,
            "IN_USE" => Self::InUse,
            "OUT_OF_ORDER" => Self::OutOfOrder,
            UNKNOWN_STATUS => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "AVAILABLE",
            Self::InUse => "IN_USE",
            Self::OutOfOrder => "OUT_OF_ORDER",
            Self::Unknown => UNKNOWN_STATUS,
            Self::Other(label) => label,
        }
    }
}

impl std::fmt::Display for PortStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PortStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Display icon derived from a port status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortIcon {
    /// Port in use
    Charging,
    /// Port out of order
    Alert,
    /// Everything else
    Plug,
}

impl PortIcon {
    pub fn for_status(status: Option<&PortStatus>) -> Self {
        match status {
            Some(PortStatus::InUse) => Self::Charging,
            Some(PortStatus::OutOfOrder) => Self::Alert,
            _ => Self::Plug,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charging => "mdi:ev-station",
            Self::Alert => "mdi:alert",
            Self::Plug => "mdi:power-plug",
        }
    }
}

impl Serialize for PortIcon {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
