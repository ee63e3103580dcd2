use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use homesync_api::provider::{Command, ExternalDevice, StatusPair};

use crate::errors::ProviderError;

use super::ProviderClient;

/// Call observed by [`MockProvider`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    AccessToken,
    ListUserDevices(String),
    DeviceStatus(String),
    SendCommands(String, Vec<Command>),
    RegisterWebhook(String),
}

/// How the mock answers command requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandReply {
    Accept,
    Refuse,
    Timeout,
}

/// In-memory cloud used by tests.
pub struct MockProvider {
    devices: Mutex<HashMap<String, Vec<ExternalDevice>>>,
    status: Mutex<HashMap<String, Vec<StatusPair>>>,
    command_reply: Mutex<CommandReply>,
    unavailable: Mutex<bool>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            status: Mutex::new(HashMap::new()),
            command_reply: Mutex::new(CommandReply::Accept),
            unavailable: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_devices(&self, provider_uid: &str, devices: Vec<ExternalDevice>) {
        self.devices.lock().unwrap().insert(provider_uid.to_string(), devices);
    }

    pub fn set_status(&self, external_id: &str, status: Vec<StatusPair>) {
        self.status.lock().unwrap().insert(external_id.to_string(), status);
    }

    pub fn set_command_reply(&self, reply: CommandReply) {
        *self.command_reply.lock().unwrap() = reply;
    }

    /// Makes every call fail with a timeout.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_commands(&self) -> Vec<(String, Vec<Command>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::SendCommands(id, commands) => Some((id, commands)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ProviderCall) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(call);

        if *self.unavailable.lock().unwrap() {
            Err(ProviderError::Timeout)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    async fn access_token(&self) -> Result<String, ProviderError> {
        self.record(ProviderCall::AccessToken)?;
        Ok("mock-token".to_string())
    }

    async fn list_user_devices(&self, provider_uid: &str) -> Result<Vec<ExternalDevice>, ProviderError> {
        self.record(ProviderCall::ListUserDevices(provider_uid.to_string()))?;
        Ok(self
            .devices
            .lock()
            .unwrap()
            .get(provider_uid)
            .cloned()
            .unwrap_or_default())
    }

    async fn device_status(&self, external_id: &str) -> Result<Vec<StatusPair>, ProviderError> {
        self.record(ProviderCall::DeviceStatus(external_id.to_string()))?;
        Ok(self
            .status
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_commands(&self, external_id: &str, commands: &[Command]) -> Result<bool, ProviderError> {
        self.record(ProviderCall::SendCommands(external_id.to_string(), commands.to_vec()))?;

        let reply = *self.command_reply.lock().unwrap();
        match reply {
            CommandReply::Accept => Ok(true),
            CommandReply::Refuse => Ok(false),
            CommandReply::Timeout => Err(ProviderError::Timeout),
        }
    }

    async fn register_webhook(&self, callback_url: &str) -> Result<bool, ProviderError> {
        self.record(ProviderCall::RegisterWebhook(callback_url.to_string()))?;
        Ok(true)
    }
}
