/// HTTP handlers for the notification service API
pub mod devices;
pub mod notifications;
pub mod preferences;
pub mod realtime;

use serde::Serialize;

/// API response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

pub use devices::register_routes as register_devices;
pub use notifications::register_routes as register_notifications;
pub use preferences::register_routes as register_preferences;
pub use realtime::register_routes as register_realtime;
