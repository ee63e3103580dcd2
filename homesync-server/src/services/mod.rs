pub mod audit_service;
pub mod automation_service;
pub mod device_locks;
pub mod device_registry;
pub mod event_notifier;
pub mod notification_service;
pub mod orchestrator;
pub mod provider;
pub mod status_normalizer;
pub mod token_service;

pub use audit_service::{AuditEntry, AuditService};
pub use automation_service::{AutomationEvaluator, RuleOutcome};
pub use device_locks::DeviceLocks;
pub use device_registry::DeviceRegistry;
pub use event_notifier::{EventNotifier, Topic};
pub use notification_service::NotificationService;
pub use orchestrator::{ControlOutcome, DeviceOrchestrator, IngestOutcome};
pub use provider::{ProviderClient, TuyaClient};
pub use token_service::{Token, TokenClaims, TokenService};
