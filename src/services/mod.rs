pub mod fanout;
pub mod notification_service;
pub mod push_dispatcher;
pub mod push_provider;

pub use fanout::{FanoutService, FanoutSummary};
pub use notification_service::NotificationService;
pub use push_dispatcher::PushDispatcher;
pub use push_provider::{ExpoPushClient, PushMessage, PushProvider, PushTicket};
