use std::fmt;

use homesync_api::provider::StatusPair;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Value of a single data point.
///
/// Devices only report scalars, anything else is rejected at the edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl StatusValue {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(StatusValue::Bool(*b)),
            Value::Number(n) => Some(StatusValue::Number(n.clone())),
            Value::String(s) => Some(StatusValue::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            StatusValue::Bool(b) => Value::Bool(*b),
            StatusValue::Number(n) => Value::Number(n.clone()),
            StatusValue::Text(s) => Value::String(s.clone()),
        }
    }

    /// Loose equality used by automation conditions: both sides compared in string form.
    pub fn matches(&self, expected: &StatusValue) -> bool {
        self.to_string() == expected.to_string()
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StatusValue::Bool(b) => write!(f, "{b}"),
            StatusValue::Number(n) => write!(f, "{n}"),
            StatusValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub code: String,
    pub value: StatusValue,
}

/// Current state of a device keyed by data point code.
///
/// Insertion order is kept for serialization; writing an existing code replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SnapshotEntry>", into = "Vec<SnapshotEntry>")]
pub struct DeviceSnapshot {
    entries: IndexMap<String, StatusValue>,
}

impl DeviceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>, value: StatusValue) {
        self.entries.insert(code.into(), value);
    }

    pub fn get(&self, code: &str) -> Option<&StatusValue> {
        self.entries.get(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StatusValue)> {
        self.entries.iter()
    }

    /// Applies every code of `update` on top of this snapshot.
    pub fn merge(&mut self, update: &DeviceSnapshot) {
        for (code, value) in update.iter() {
            self.entries.insert(code.clone(), value.clone());
        }
    }

    pub fn to_pairs(&self) -> Vec<StatusPair> {
        self.entries
            .iter()
            .map(|(code, value)| StatusPair {
                code: code.clone(),
                value: value.to_json(),
            })
            .collect()
    }
}

impl From<Vec<SnapshotEntry>> for DeviceSnapshot {
    fn from(entries: Vec<SnapshotEntry>) -> Self {
        let mut snapshot = DeviceSnapshot::new();
        for entry in entries {
            snapshot.insert(entry.code, entry.value);
        }
        snapshot
    }
}

impl From<DeviceSnapshot> for Vec<SnapshotEntry> {
    fn from(snapshot: DeviceSnapshot) -> Self {
        snapshot
            .entries
            .into_iter()
            .map(|(code, value)| SnapshotEntry { code, value })
            .collect()
    }
}
