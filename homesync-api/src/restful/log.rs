use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLogResponse {
    pub id: i32,
    pub device_id: i32,
    /// One of `status_change`, `automation_trigger`, `manual_control`.
    pub event_type: String,
    pub command: Option<String>,
    pub value: Option<String>,
    #[cfg_attr(feature = "docs", schema(value_type = Option<Object>))]
    pub event_data: Option<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[cfg_attr(feature = "docs", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "docs", into_params(parameter_in = Query))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceLogQuery {
    /// Restrict to one internal device id.
    pub device_id: Option<i32>,
}
