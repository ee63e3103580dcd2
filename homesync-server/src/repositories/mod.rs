mod automation_rule;
mod device;
mod device_log;
mod notification;
mod user;

pub use automation_rule::AutomationRuleRepository;
pub use device::DeviceRepository;
pub use device_log::DeviceLogRepository;
pub use notification::NotificationRepository;
pub use user::UserRepository;
