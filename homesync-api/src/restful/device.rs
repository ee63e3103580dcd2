use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::provider::StatusPair;

use super::DeviceLogResponse;

/// Control request issued from the dashboard.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceControlRequest {
    /// Provider device identifier.
    pub device_id: String,
    /// Data point code, e.g. `switch_led`.
    pub command: String,
    /// Value to write.
    #[serde(default)]
    #[cfg_attr(feature = "docs", schema(value_type = Object))]
    pub value: Value,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResponse {
    /// Internal identifier.
    pub id: i32,
    /// Provider device identifier.
    pub external_id: String,
    pub name: String,
    pub category: String,
    pub product_id: String,
    pub product_name: String,
    pub icon: Option<String>,
    pub location: Option<String>,
    pub online: bool,
    /// Last known data points.
    pub status: Vec<StatusPair>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDetailResponse {
    #[serde(flatten)]
    pub device: DeviceResponse,
    /// Most recent audit entries of the device.
    pub logs: Vec<DeviceLogResponse>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatusResponse {
    pub success: bool,
    pub status: Vec<StatusPair>,
}
