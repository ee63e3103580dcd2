use axum::http::StatusCode;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl PayloadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PayloadError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        }
    }
}
