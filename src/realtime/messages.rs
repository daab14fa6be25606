/// Frame types for the realtime relay
use crate::models::{ActorInfo, Notification};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RealtimeMessage {
    /// Server pushes a stored notification plus the live unread count
    Notification {
        notification: Notification,
        #[serde(skip_serializing_if = "Option::is_none")]
        actor: Option<ActorInfo>,
        unread_count: i64,
    },

    /// Heartbeat from server
    Ping { timestamp: i64 },

    /// Client heartbeat response
    Pong { timestamp: i64 },

    /// Connection established confirmation
    Connected { server_id: String, timestamp: i64 },

    /// Error frame from server
    Error { code: String, message: String },
}

impl RealtimeMessage {
    pub fn notification(
        notification: Notification,
        actor: Option<ActorInfo>,
        unread_count: i64,
    ) -> Self {
        RealtimeMessage::Notification {
            notification,
            actor,
            unread_count,
        }
    }

    pub fn ping() -> Self {
        RealtimeMessage::Ping {
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn pong(timestamp: i64) -> Self {
        RealtimeMessage::Pong { timestamp }
    }

    pub fn connected() -> Self {
        RealtimeMessage::Connected {
            server_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn error(code: String, message: String) -> Self {
        RealtimeMessage::Error { code, message }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
