mod signer;
mod token_cache;
mod tuya_client;

#[cfg(any(test, feature = "mock"))]
mod mock;

pub use signer::*;
pub use token_cache::*;
pub use tuya_client::*;

#[cfg(any(test, feature = "mock"))]
pub use mock::*;

use async_trait::async_trait;
use homesync_api::provider::{Command, ExternalDevice, StatusPair};

use crate::errors::ProviderError;

/// Cloud side of the system. Every call is a single attempt bounded by the client timeout.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn access_token(&self) -> Result<String, ProviderError>;

    async fn list_user_devices(&self, provider_uid: &str) -> Result<Vec<ExternalDevice>, ProviderError>;

    async fn device_status(&self, external_id: &str) -> Result<Vec<StatusPair>, ProviderError>;

    /// `Ok(false)` when the cloud answered but refused the commands.
    async fn send_commands(&self, external_id: &str, commands: &[Command]) -> Result<bool, ProviderError>;

    async fn register_webhook(&self, callback_url: &str) -> Result<bool, ProviderError>;
}
