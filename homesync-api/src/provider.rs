//! Wire types of the Tuya cloud OpenAPI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope wrapping every cloud API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub t: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResult {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expire_time: i64,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub uid: String,
}

/// Device as listed by `GET /v1.0/users/{uid}/devices`.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalDevice {
    /// Provider device identifier.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub status: Vec<StatusPair>,
    #[serde(default)]
    pub icon: String,
}

/// One data point reported by a device.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPair {
    pub code: String,
    #[cfg_attr(feature = "docs", schema(value_type = Object))]
    pub value: Value,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub code: String,
    #[cfg_attr(feature = "docs", schema(value_type = Object))]
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub callback_url: String,
    pub event_types: Vec<String>,
}

impl WebhookSubscription {
    pub fn status_events(callback_url: impl Into<String>) -> Self {
        Self {
            callback_url: callback_url.into(),
            event_types: vec![
                "device.status.update".to_string(),
                "device.online".to_string(),
                "device.offline".to_string(),
            ],
        }
    }
}
