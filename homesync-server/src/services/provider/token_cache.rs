use std::future::Future;
use std::time::Duration;

use homesync_api::provider::TokenResult;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::errors::ProviderError;

/// Tokens are dropped this long before the cloud would expire them.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Access token shared by all requests.
///
/// The lock is held across a refresh, so concurrent callers wait for one fetch instead of issuing their own.
#[derive(Default)]
pub struct TokenCache {
    current: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenResult, ProviderError>>,
    {
        let mut current = self.current.lock().await;

        if let Some(cached) = current.as_ref().filter(|cached| Instant::now() < cached.expires_at) {
            return Ok(cached.token.clone());
        }

        let fresh = refresh().await?;
        let lifetime = Duration::from_secs(u64::try_from(fresh.expire_time).unwrap_or(0));
        let expires_at = Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN);

        tracing::debug!(expires_in = ?lifetime.saturating_sub(EXPIRY_MARGIN), "Provider token refreshed");

        *current = Some(CachedToken {
            token: fresh.access_token.clone(),
            expires_at,
        });

        Ok(fresh.access_token)
    }

    /// Forgets the cached token, e.g. after the cloud reported it invalid.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}
