use homesync_api::restful::DeviceResponse;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use time::OffsetDateTime;

use super::{DeviceSnapshot, Table};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: i32,
    /// Identifier assigned by the cloud, unique across users.
    pub external_id: String,
    pub user_id: i32,
    pub name: String,
    pub category: String,
    pub product_id: String,
    pub product_name: String,
    pub icon: Option<String>,
    pub location: Option<String>,
    pub online: bool,
    pub status: Json<DeviceSnapshot>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Device {
    pub fn is_owned_by(&self, user_id: i32) -> bool {
        self.user_id == user_id
    }

    pub fn snapshot(&self) -> &DeviceSnapshot {
        &self.status.0
    }
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        DeviceResponse {
            id: device.id,
            status: device.status.0.to_pairs(),
            external_id: device.external_id,
            name: device.name,
            category: device.category,
            product_id: device.product_id,
            product_name: device.product_name,
            icon: device.icon,
            location: device.location,
            online: device.online,
            created_at: device.created_at,
            updated_at: device.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct DeviceTable;

impl Table for DeviceTable {
    fn name(&self) -> &'static str {
        "devices"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id VARCHAR(255) NOT NULL UNIQUE,
                user_id INTEGER NOT NULL,
                name VARCHAR(255) NOT NULL,
                category VARCHAR(255) NOT NULL DEFAULT '',
                product_id VARCHAR(255) NOT NULL DEFAULT '',
                product_name VARCHAR(255) NOT NULL DEFAULT '',
                icon TEXT,
                location TEXT,
                online BOOLEAN NOT NULL DEFAULT FALSE,
                status TEXT NOT NULL DEFAULT '[]',
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_devices_user_id ON devices (user_id);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS devices;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["users"]
    }
}
