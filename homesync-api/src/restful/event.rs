use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Frame pushed to real-time subscribers.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    pub topic: String,
    pub event: String,
    #[cfg_attr(feature = "docs", schema(value_type = Object))]
    pub payload: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[cfg_attr(feature = "docs", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "docs", into_params(parameter_in = Query))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventQuery {
    /// Provider device identifier to follow in addition to the user stream.
    pub device: Option<String>,
}
