pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod realtime;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use realtime::{ConnectionManager, RealtimeMessage};
pub use services::{ExpoPushClient, FanoutService, NotificationService, PushDispatcher};
