use std::sync::Arc;

use homesync_api::provider::{Command, StatusPair};
use homesync_api::restful::{DeviceControlRequest, WebhookPayload};
use serde_json::{Value, json};

use crate::configs::Storage;
use crate::errors::{DeviceError, PayloadError};
use crate::models::{Device, DeviceEventKind, DeviceSnapshot, NotificationKind};
use crate::repositories::{AutomationRuleRepository, UserRepository};

use super::audit_service::{AuditEntry, AuditService};
use super::automation_service::{AutomationEvaluator, RuleOutcome};
use super::device_locks::DeviceLocks;
use super::device_registry::DeviceRegistry;
use super::event_notifier::{DEVICE_STATUS_CHANGED, DEVICE_STATUS_UPDATED, DEVICES_SYNCED, EventNotifier, Topic};
use super::notification_service::NotificationService;
use super::provider::ProviderClient;
use super::status_normalizer::{normalize, normalize_pairs};

/// Terminal state of a control request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Controlled,
    Failed,
}

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Processed { device: Device, fired: Vec<RuleOutcome> },
    /// No device with that external id; the update was discarded.
    UnknownDevice,
}

/// Drives sync, control and status ingestion across the registry, the cloud and the side channels.
pub struct DeviceOrchestrator {
    registry: DeviceRegistry,
    users: UserRepository,
    rules: AutomationRuleRepository,
    provider: Arc<dyn ProviderClient>,
    evaluator: AutomationEvaluator,
    notifications: Arc<NotificationService>,
    notifier: Arc<EventNotifier>,
    audit: AuditService,
    locks: DeviceLocks,
}

impl DeviceOrchestrator {
    pub fn new(
        storage: Arc<Storage>,
        provider: Arc<dyn ProviderClient>,
        notifier: Arc<EventNotifier>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            registry: DeviceRegistry::new(storage.clone()),
            users: UserRepository::new(storage.clone()),
            rules: AutomationRuleRepository::new(storage.clone()),
            provider,
            evaluator: AutomationEvaluator::new(notifications.clone()),
            notifications,
            notifier,
            audit: AuditService::new(storage),
            locks: DeviceLocks::new(),
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn audit(&self) -> &AuditService {
        &self.audit
    }

    /// Device with `external_id` if `user_id` owns it.
    pub async fn owned_device(&self, user_id: i32, external_id: &str) -> Result<Device, DeviceError> {
        let device = self
            .registry
            .find_by_external_id(external_id)
            .await?
            .ok_or(DeviceError::DeviceNotFound)?;

        if !device.is_owned_by(user_id) {
            return Err(DeviceError::InsufficientPermission);
        }

        Ok(device)
    }

    /// Imports the user's cloud devices. The batch is written all-or-nothing.
    pub async fn sync_devices(&self, user_id: i32) -> Result<Vec<Device>, DeviceError> {
        let provider_uid = self
            .users
            .find_by_id(user_id)
            .await?
            .and_then(|user| user.provider_uid)
            .filter(|uid| !uid.is_empty())
            .ok_or(DeviceError::AccountNotLinked)?;

        let external = self.provider.list_user_devices(&provider_uid).await?;

        let batch = external
            .into_iter()
            .map(|device| {
                let snapshot = normalize_pairs(&device.status)?;
                Ok((device, snapshot))
            })
            .collect::<Result<Vec<_>, PayloadError>>()?;

        let devices = self.registry.upsert_batch(user_id, &batch).await?;
        tracing::info!(user_id, count = devices.len(), "Devices synced");

        self.notifications
            .create(
                user_id,
                "Devices Synced",
                &format!("Successfully synced {} devices from Tuya Cloud", devices.len()),
                NotificationKind::Success,
            )
            .await;
        self.notifier
            .publish(&Topic::User(user_id), DEVICES_SYNCED, json!({ "count": devices.len() }))
            .await;

        Ok(devices)
    }

    /// One command, one attempt. Validation failures are errors; anything after the send is an outcome.
    pub async fn control_device(
        &self,
        user_id: i32,
        request: &DeviceControlRequest,
    ) -> Result<ControlOutcome, DeviceError> {
        if request.command.trim().is_empty() {
            return Err(PayloadError::MalformedPayload("command is required".to_string()).into());
        }

        let device = self.owned_device(user_id, &request.device_id).await?;

        let command = Command {
            code: request.command.clone(),
            value: request.value.clone(),
        };

        let accepted = match self
            .provider
            .send_commands(&device.external_id, std::slice::from_ref(&command))
            .await
        {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(device = %device.external_id, "Command delivery failed: {}", e);
                false
            }
        };

        if !accepted {
            return Ok(ControlOutcome::Failed);
        }

        self.notifier
            .publish(
                &Topic::Device(device.external_id.clone()),
                DEVICE_STATUS_CHANGED,
                json!({
                    "deviceId": device.external_id,
                    "command": command.code,
                    "value": command.value,
                }),
            )
            .await;

        self.audit
            .append(
                AuditEntry::for_device(&device, DeviceEventKind::ManualControl)
                    .with_command(command.code, value_text(&command.value)),
            )
            .await;

        Ok(ControlOutcome::Controlled)
    }

    pub async fn ingest_webhook(&self, payload: &WebhookPayload) -> Result<IngestOutcome, DeviceError> {
        let snapshot = normalize(&payload.status)?;

        self.ingest_status(&payload.dev_id, &snapshot).await
    }

    /// Applies a status update, then fans it out, runs automations and records everything.
    pub async fn ingest_status(
        &self,
        external_id: &str,
        snapshot: &DeviceSnapshot,
    ) -> Result<IngestOutcome, DeviceError> {
        let device = {
            let _guard = self.locks.lock(external_id).await;

            let Some(device) = self.registry.apply_status(external_id, snapshot).await? else {
                tracing::warn!(device = external_id, "Status update for unknown device discarded");
                return Ok(IngestOutcome::UnknownDevice);
            };

            self.notifier
                .publish(
                    &Topic::Device(external_id.to_string()),
                    DEVICE_STATUS_UPDATED,
                    json!({ "deviceId": external_id, "status": snapshot.to_pairs() }),
                )
                .await;

            device
        };

        let status = serde_json::to_string(&snapshot.to_pairs()).unwrap_or_default();
        self.audit
            .append(AuditEntry::for_device(&device, DeviceEventKind::StatusChange).with_command("status_update", status))
            .await;

        let rules = self.rules.find_active_by_user(device.user_id).await?;
        let fired = self.evaluator.evaluate(&device, snapshot, &rules).await;

        for outcome in &fired {
            self.audit
                .append(AuditEntry::for_device(&device, DeviceEventKind::AutomationTrigger).with_event_data(outcome.event_data()))
                .await;
        }

        Ok(IngestOutcome::Processed { device, fired })
    }

    /// Current data points as reported by the cloud, without touching the registry.
    pub async fn live_status(&self, user_id: i32, external_id: &str) -> Result<Vec<StatusPair>, DeviceError> {
        let device = self.owned_device(user_id, external_id).await?;

        Ok(self.provider.device_status(&device.external_id).await?)
    }

    /// Polls the cloud and feeds the answer through the same path as a webhook push.
    pub async fn refresh_device_status(
        &self,
        user_id: i32,
        external_id: &str,
    ) -> Result<Vec<StatusPair>, DeviceError> {
        let device = self.owned_device(user_id, external_id).await?;
        let status = self.provider.device_status(&device.external_id).await?;
        let snapshot = normalize_pairs(&status)?;

        self.ingest_status(&device.external_id, &snapshot).await?;

        Ok(status)
    }

    /// Subscribes the callback for status pushes. Failures are only logged.
    pub async fn register_webhook(&self, callback_url: &str) {
        match self.provider.register_webhook(callback_url).await {
            Ok(true) => tracing::info!(callback_url, "Webhook registered"),
            Ok(false) => tracing::warn!(callback_url, "Webhook registration refused"),
            Err(e) => tracing::error!(callback_url, "Webhook registration failed: {}", e),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use homesync_api::provider::ExternalDevice;
    use serde_json::json;

    use crate::models::StatusValue;
    use crate::services::provider::{CommandReply, MockProvider, ProviderCall};
    use crate::tests::*;

    use super::*;

    struct Fixture {
        storage: Arc<Storage>,
        provider: Arc<MockProvider>,
        notifier: Arc<EventNotifier>,
        notifications: Arc<NotificationService>,
        orchestrator: DeviceOrchestrator,
    }

    async fn fixture() -> Fixture {
        let storage = setup_test_db().await;
        let provider = Arc::new(MockProvider::new());
        let notifier = Arc::new(EventNotifier::new());
        let notifications = Arc::new(NotificationService::new(storage.clone(), notifier.clone()));
        let orchestrator =
            DeviceOrchestrator::new(storage.clone(), provider.clone(), notifier.clone(), notifications.clone());

        Fixture {
            storage,
            provider,
            notifier,
            notifications,
            orchestrator,
        }
    }

    fn lamp() -> ExternalDevice {
        serde_json::from_value(json!({
            "id": "dev1",
            "name": "Lamp",
            "online": true,
            "status": [{ "code": "switch", "value": true }]
        }))
        .unwrap()
    }

    fn webhook(status: Value) -> WebhookPayload {
        serde_json::from_value(json!({ "devId": "dev1", "status": status, "ts": 1700000000000i64 })).unwrap()
    }

    fn control(device_id: &str) -> DeviceControlRequest {
        DeviceControlRequest {
            device_id: device_id.to_string(),
            command: "switch_led".to_string(),
            value: json!(true),
        }
    }

    #[tokio::test]
    async fn test_sync_creates_device_and_summary() {
        let f = fixture().await;
        let user = create_test_user(f.storage.clone(), "owner@example.com", Some("uid1")).await;
        f.provider.set_devices("uid1", vec![lamp()]);

        let devices = f.orchestrator.sync_devices(user.id).await.unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].external_id, "dev1");
        assert_eq!(devices[0].snapshot().get("switch"), Some(&StatusValue::Bool(true)));

        let notifications = f.notifications.recent(user.id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Devices Synced");
        assert_eq!(notifications[0].message, "Successfully synced 1 devices from Tuya Cloud");
        assert_eq!(notifications[0].notification_type, "success");
    }

    #[tokio::test]
    async fn test_sync_requires_linked_account() {
        let f = fixture().await;
        let user = create_test_user(f.storage.clone(), "owner@example.com", None).await;

        let result = f.orchestrator.sync_devices(user.id).await;

        assert!(matches!(result, Err(DeviceError::AccountNotLinked)));
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sync_with_bad_status_writes_nothing() {
        let f = fixture().await;
        let user = create_test_user(f.storage.clone(), "owner@example.com", Some("uid1")).await;
        let mut broken = lamp();
        broken.id = "dev2".to_string();
        broken.status = vec![StatusPair { code: "colour_data".into(), value: json!({ "h": 1 }) }];
        f.provider.set_devices("uid1", vec![lamp(), broken]);

        let result = f.orchestrator.sync_devices(user.id).await;

        assert!(matches!(result, Err(DeviceError::Payload(_))));
        assert!(f.orchestrator.registry().find_by_user(user.id).await.unwrap().is_empty());
        assert!(f.notifications.recent(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_control_publishes_and_audits() {
        let f = fixture().await;
        let user = create_test_user(f.storage.clone(), "owner@example.com", None).await;
        let device = create_test_device(f.storage.clone(), user.id, "dev1", "Lamp").await;
        let mut events = f.notifier.subscribe(&Topic::Device("dev1".into())).await;

        let outcome = f.orchestrator.control_device(user.id, &control("dev1")).await.unwrap();

        assert_eq!(outcome, ControlOutcome::Controlled);
        assert_eq!(f.provider.sent_commands().len(), 1);
        assert_eq!(events.recv().await.unwrap().event, DEVICE_STATUS_CHANGED);

        let logs = f.orchestrator.audit().recent(user.id, Some(device.id)).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event_type, "manual_control");
        assert_eq!(logs[0].command.as_deref(), Some("switch_led"));
        assert_eq!(logs[0].value.as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_control_of_foreign_device_sends_nothing() {
        let f = fixture().await;
        let owner = create_test_user(f.storage.clone(), "owner@example.com", None).await;
        let intruder = create_test_user(f.storage.clone(), "intruder@example.com", None).await;
        create_test_device(f.storage.clone(), owner.id, "dev1", "Lamp").await;

        let result = f.orchestrator.control_device(intruder.id, &control("dev1")).await;

        assert!(matches!(result, Err(DeviceError::InsufficientPermission)));
        assert!(f.provider.calls().is_empty());
        assert!(f.orchestrator.audit().recent(owner.id, None).await.unwrap().is_empty());
        assert!(f.orchestrator.audit().recent(intruder.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_control_of_unknown_device() {
        let f = fixture().await;
        let user = create_test_user(f.storage.clone(), "owner@example.com", None).await;

        let result = f.orchestrator.control_device(user.id, &control("ghost")).await;

        assert!(matches!(result, Err(DeviceError::DeviceNotFound)));
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_control_failure_leaves_no_trace() {
        for reply in [CommandReply::Refuse, CommandReply::Timeout] {
            let f = fixture().await;
            let user = create_test_user(f.storage.clone(), "owner@example.com", None).await;
            create_test_device(f.storage.clone(), user.id, "dev1", "Lamp").await;
            let mut events = f.notifier.subscribe(&Topic::Device("dev1".into())).await;
            f.provider.set_command_reply(reply);

            let outcome = f.orchestrator.control_device(user.id, &control("dev1")).await.unwrap();

            assert_eq!(outcome, ControlOutcome::Failed);
            assert_eq!(f.provider.sent_commands().len(), 1);
            assert!(events.try_recv().is_err());
            assert!(f.orchestrator.audit().recent(user.id, None).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_webhook_for_unknown_device_creates_nothing() {
        let f = fixture().await;

        let outcome = f
            .orchestrator
            .ingest_webhook(&webhook(json!([{ "code": "switch", "value": "true" }])))
            .await
            .unwrap();

        assert!(matches!(outcome, IngestOutcome::UnknownDevice));
        assert!(f.orchestrator.registry().find_by_external_id("dev1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_webhook_redelivery_is_stable() {
        let f = fixture().await;
        let user = create_test_user(f.storage.clone(), "owner@example.com", None).await;
        let device = create_test_device(f.storage.clone(), user.id, "dev1", "Lamp").await;
        let payload = webhook(json!([{ "code": "switch", "value": "true" }]));

        f.orchestrator.ingest_webhook(&payload).await.unwrap();
        f.orchestrator.ingest_webhook(&payload).await.unwrap();

        let stored = f.orchestrator.registry().find_by_internal_id(device.id).await.unwrap().unwrap();
        assert_eq!(stored.snapshot().len(), 1);
        assert_eq!(stored.snapshot().get("switch"), Some(&StatusValue::Text("true".into())));

        let logs = f.orchestrator.audit().recent(user.id, Some(device.id)).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|log| log.event_type == "status_change"));
    }

    #[tokio::test]
    async fn test_webhook_fires_notify_rule() {
        let f = fixture().await;
        let user = create_test_user(f.storage.clone(), "owner@example.com", None).await;
        let device = create_test_device(f.storage.clone(), user.id, "dev1", "Lamp").await;
        create_test_rule(
            f.storage.clone(),
            user.id,
            "Lamp on",
            json!({ "switch": "true" }),
            json!({ "notify": "Lamp on" }),
            true,
        )
        .await;
        create_test_rule(
            f.storage.clone(),
            user.id,
            "Disabled",
            json!({ "switch": "true" }),
            json!({ "notify": "never" }),
            false,
        )
        .await;

        let outcome = f
            .orchestrator
            .ingest_webhook(&webhook(json!([{ "code": "switch", "value": "true" }])))
            .await
            .unwrap();

        let IngestOutcome::Processed { fired, .. } = outcome else {
            panic!("device should be known");
        };
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].rule_name, "Lamp on");

        let notifications = f.notifications.recent(user.id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, "Lamp on");

        let logs = f.orchestrator.audit().recent(user.id, Some(device.id)).await.unwrap();
        let kinds: Vec<&str> = logs.iter().map(|log| log.event_type.as_str()).collect();
        assert!(kinds.contains(&"automation_trigger"));
        assert!(kinds.contains(&"status_change"));
    }

    #[tokio::test]
    async fn test_malformed_webhook_is_rejected() {
        let f = fixture().await;

        let result = f.orchestrator.ingest_webhook(&webhook(json!("switch=true"))).await;

        assert!(matches!(result, Err(DeviceError::Payload(_))));
    }

    #[tokio::test]
    async fn test_refresh_runs_ingestion() {
        let f = fixture().await;
        let user = create_test_user(f.storage.clone(), "owner@example.com", None).await;
        let device = create_test_device(f.storage.clone(), user.id, "dev1", "Lamp").await;
        f.provider
            .set_status("dev1", vec![StatusPair { code: "bright_value".into(), value: json!(300) }]);

        let status = f.orchestrator.refresh_device_status(user.id, "dev1").await.unwrap();

        assert_eq!(status.len(), 1);
        let stored = f.orchestrator.registry().find_by_internal_id(device.id).await.unwrap().unwrap();
        assert_eq!(stored.snapshot().get("bright_value").unwrap().to_string(), "300");
        assert!(f.provider.calls().contains(&ProviderCall::DeviceStatus("dev1".into())));
    }

    #[tokio::test]
    async fn test_unavailable_cloud_is_a_provider_error() {
        let f = fixture().await;
        let user = create_test_user(f.storage.clone(), "owner@example.com", Some("uid1")).await;
        create_test_device(f.storage.clone(), user.id, "dev1", "Lamp").await;
        f.provider.set_unavailable(true);

        assert!(matches!(f.orchestrator.sync_devices(user.id).await, Err(DeviceError::Provider(_))));
        assert!(matches!(f.orchestrator.live_status(user.id, "dev1").await, Err(DeviceError::Provider(_))));
    }
}
