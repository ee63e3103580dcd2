mod device_handle;
mod log_handle;
mod notification_handle;
mod sse_handle;
mod webhook_handle;

pub use device_handle::*;
pub use log_handle::*;
pub use notification_handle::*;
pub use sse_handle::*;
pub use webhook_handle::*;
