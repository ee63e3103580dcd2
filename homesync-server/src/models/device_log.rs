use std::fmt;

use homesync_api::restful::DeviceLogResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use time::OffsetDateTime;

use super::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEventKind {
    StatusChange,
    AutomationTrigger,
    ManualControl,
}

impl DeviceEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceEventKind::StatusChange => "status_change",
            DeviceEventKind::AutomationTrigger => "automation_trigger",
            DeviceEventKind::ManualControl => "manual_control",
        }
    }
}

impl fmt::Display for DeviceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit entry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceLog {
    pub id: i32,
    pub device_id: i32,
    pub user_id: i32,
    pub event_type: String,
    pub command: Option<String>,
    pub value: Option<String>,
    pub event_data: Option<Json<Value>>,
    pub timestamp: OffsetDateTime,
}

impl From<DeviceLog> for DeviceLogResponse {
    fn from(log: DeviceLog) -> Self {
        DeviceLogResponse {
            id: log.id,
            device_id: log.device_id,
            event_type: log.event_type,
            command: log.command,
            value: log.value,
            event_data: log.event_data.map(|data| data.0),
            timestamp: log.timestamp,
        }
    }
}

#[derive(Clone)]
pub struct DeviceLogTable;

impl Table for DeviceLogTable {
    fn name(&self) -> &'static str {
        "device_logs"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS device_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                event_type VARCHAR(64) NOT NULL,
                command VARCHAR(255),
                value TEXT,
                event_data TEXT,
                timestamp TIMESTAMP NOT NULL,
                FOREIGN KEY (device_id) REFERENCES devices (id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users (id)
            );
            CREATE INDEX IF NOT EXISTS idx_device_logs_user_time ON device_logs (user_id, timestamp);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS device_logs;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["devices", "users"]
    }
}
