use std::sync::Arc;

use serde_json::Value;
use sqlx::types::Json;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::{Device, DeviceEventKind, DeviceLog};
use crate::repositories::DeviceLogRepository;

pub const LOG_LIMIT: i64 = 100;

/// One audit line before it is stamped and written.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub device_id: i32,
    pub user_id: i32,
    pub kind: DeviceEventKind,
    pub command: Option<String>,
    pub value: Option<String>,
    pub event_data: Option<Value>,
}

impl AuditEntry {
    pub fn for_device(device: &Device, kind: DeviceEventKind) -> Self {
        Self {
            device_id: device.id,
            user_id: device.user_id,
            kind,
            command: None,
            value: None,
            event_data: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>, value: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self.value = Some(value.into());
        self
    }

    pub fn with_event_data(mut self, event_data: Value) -> Self {
        self.event_data = Some(event_data);
        self
    }
}

#[derive(Clone)]
pub struct AuditService {
    logs: DeviceLogRepository,
}

impl AuditService {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            logs: DeviceLogRepository::new(storage),
        }
    }

    /// Stamps and stores the entry. Storage failures are logged, never returned.
    pub async fn append(&self, entry: AuditEntry) {
        let log = DeviceLog {
            id: 0,
            device_id: entry.device_id,
            user_id: entry.user_id,
            event_type: entry.kind.to_string(),
            command: entry.command,
            value: entry.value,
            event_data: entry.event_data.map(Json),
            timestamp: OffsetDateTime::now_utc(),
        };

        let result = async {
            let mut tx = self.logs.get_pool().begin().await?;
            self.logs.create(&log, &mut tx).await?;
            tx.commit().await
        }
        .await;

        if let Err(e) = result {
            tracing::error!(
                device_id = log.device_id,
                event_type = %log.event_type,
                "Failed to write audit entry: {}",
                e
            );
        }
    }

    pub async fn recent(&self, user_id: i32, device_id: Option<i32>) -> Result<Vec<DeviceLog>, sqlx::Error> {
        self.logs.find_recent_by_user(user_id, device_id, LOG_LIMIT).await
    }
}
