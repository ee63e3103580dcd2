pub mod api;
pub mod device;
pub mod payload;
pub mod provider;

pub use api::ApiError;
pub use device::DeviceError;
pub use payload::PayloadError;
pub use provider::ProviderError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use homesync_api::restful::ActionResponse;
use serde_json::json;
use uuid::Uuid;

/// Logs an internal failure under a fresh id that is also handed to the client.
fn report_internal(kind: &str, error: &dyn std::fmt::Display) -> String {
    let error_id = Uuid::new_v4();
    tracing::error!(error_id = ?error_id, "{kind} error: {error}");
    error_id.to_string()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let internal = "Internal server error".to_string();

        let (status, message, error_id) = match self {
            ApiError::DeviceError(e) if e.is_internal() => {
                let error_id = report_internal("Device", &e);
                (e.status_code(), e.user_message(), Some(error_id))
            }
            ApiError::DeviceError(e) => (e.status_code(), e.user_message(), None),
            ApiError::PayloadError(e) => (e.status_code(), e.to_string(), None),
            ApiError::NotificationNotFound => (StatusCode::NOT_FOUND, "Notification not found".to_string(), None),
            ApiError::DatabaseError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                internal,
                Some(report_internal("Database", &e)),
            ),
            ApiError::InternalError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                internal,
                Some(report_internal("Internal", &e)),
            ),
        };

        let mut error = json!({ "code": status.as_u16(), "message": message });
        if let Some(error_id) = error_id {
            error["error_id"] = json!(error_id);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Failure of an action endpoint, rendered as `{ success: false, message }`.
#[derive(Debug)]
pub struct ActionError(pub DeviceError);

impl From<DeviceError> for ActionError {
    fn from(error: DeviceError) -> Self {
        ActionError(error)
    }
}

impl From<PayloadError> for ActionError {
    fn from(error: PayloadError) -> Self {
        ActionError(error.into())
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let ActionError(error) = self;

        if error.is_internal() {
            report_internal("Action", &error);
        } else {
            tracing::debug!("Action rejected: {}", error);
        }

        (error.status_code(), Json(ActionResponse::failed(error.user_message()))).into_response()
    }
}
