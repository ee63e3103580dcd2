#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider request timed out")]
    Timeout,

    #[error("Provider transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Provider rejected request (code {code:?}): {message}")]
    Rejected { code: Option<i64>, message: String },

    #[error("Provider response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Provider response carried no result")]
    EmptyResult,
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Transport(error)
        }
    }
}
