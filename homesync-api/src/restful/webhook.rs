use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status push delivered by the cloud to the webhook endpoint.
///
/// `status` is kept untyped here; the server normalizes it.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "dataId", default)]
    pub data_id: Option<String>,
    #[serde(rename = "devId")]
    pub dev_id: String,
    #[serde(rename = "productKey", default)]
    pub product_key: Option<String>,
    #[cfg_attr(feature = "docs", schema(value_type = Vec<Object>))]
    pub status: Value,
    #[serde(default)]
    pub ts: i64,
}
