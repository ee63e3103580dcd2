use axum::http::StatusCode;

use super::{PayloadError, ProviderError};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device not found")]
    DeviceNotFound,

    #[error("Insufficient permission")]
    InsufficientPermission,

    #[error("Cloud account not linked")]
    AccountNotLinked,

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl DeviceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeviceError::DeviceNotFound => StatusCode::NOT_FOUND,
            DeviceError::InsufficientPermission => StatusCode::FORBIDDEN,
            DeviceError::AccountNotLinked => StatusCode::BAD_REQUEST,
            DeviceError::Payload(e) => e.status_code(),
            DeviceError::Provider(_) => StatusCode::BAD_GATEWAY,
            DeviceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to end users; upstream and storage details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            DeviceError::DeviceNotFound => "Device not found".to_string(),
            DeviceError::InsufficientPermission => "Unauthorized".to_string(),
            DeviceError::AccountNotLinked => {
                "Tuya account not linked. Please link your Tuya account first.".to_string()
            }
            DeviceError::Payload(e) => e.to_string(),
            DeviceError::Provider(_) => "Cloud service unavailable. Please try again.".to_string(),
            DeviceError::Persistence(_) => "Internal server error".to_string(),
        }
    }

    /// Whether the failure needs operator attention rather than being a caller mistake.
    pub fn is_internal(&self) -> bool {
        matches!(self, DeviceError::Provider(_) | DeviceError::Persistence(_))
    }
}
