mod automation_rule;
mod device;
mod device_log;
mod notification;
mod snapshot;
mod user;

pub use automation_rule::{AutomationAction, AutomationRule, AutomationRuleTable, TriggerConditions};
pub use device::{Device, DeviceTable};
pub use device_log::{DeviceEventKind, DeviceLog, DeviceLogTable};
pub use notification::{Notification, NotificationKind, NotificationTable};
pub use snapshot::{DeviceSnapshot, StatusValue};
pub use user::{User, UserTable};

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;

    /// The dependencies of the table
    fn dependencies(&self) -> Vec<&'static str>;
}
