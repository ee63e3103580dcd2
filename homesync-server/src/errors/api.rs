use super::{DeviceError, PayloadError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),

    #[error("Payload error: {0}")]
    PayloadError(#[from] PayloadError),

    #[error("Notification not found")]
    NotificationNotFound,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
