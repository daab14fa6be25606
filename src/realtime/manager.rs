/// Realtime connection manager
///
/// Routes notification frames to connected clients over per-user channels.
/// Purely additive to the database write: a disconnected client simply misses
/// the frame and sees the notification on its next fetch.
use super::RealtimeMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

pub type RealtimeSender = mpsc::UnboundedSender<RealtimeMessage>;

/// Thread-safe registry of active connections, multiple per user
#[derive(Clone)]
pub struct ConnectionManager {
    connections: Arc<RwLock<HashMap<Uuid, Vec<RealtimeSender>>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a connection for a user; returns a connection id for logs
    pub async fn subscribe(&self, user_id: Uuid, sender: RealtimeSender) -> String {
        let mut connections = self.connections.write().await;
        connections.entry(user_id).or_default().push(sender);
        format!("{}-{}", user_id, chrono::Utc::now().timestamp_millis())
    }

    /// Drop all connections for a user
    pub async fn unsubscribe(&self, user_id: Uuid) {
        let mut connections = self.connections.write().await;
        connections.remove(&user_id);
    }

    /// Send a frame to every connection of one user.
    ///
    /// Silently does nothing when the user has no connections; closed
    /// channels are pruned as they are discovered.
    pub async fn send_to_user(&self, user_id: Uuid, message: RealtimeMessage) {
        let mut connections = self.connections.write().await;
        if let Some(senders) = connections.get_mut(&user_id) {
            senders.retain(|sender| sender.send(message.clone()).is_ok());
            if senders.is_empty() {
                connections.remove(&user_id);
            }
        }
    }

    /// Send a frame to every connected user
    pub async fn broadcast(&self, message: RealtimeMessage) {
        let connections = self.connections.read().await;
        for senders in connections.values() {
            for sender in senders {
                let _ = sender.send(message.clone());
            }
        }
    }

    pub async fn ping_all(&self) {
        self.broadcast(RealtimeMessage::ping()).await;
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        let connections = self.connections.read().await;
        connections.get(&user_id).map(|v| v.len()).unwrap_or(0)
    }

    pub async fn total_connections(&self) -> usize {
        let connections = self.connections.read().await;
        connections.values().map(|v| v.len()).sum()
    }

    pub async fn connected_users_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    pub async fn connected_user_ids(&self) -> Vec<Uuid> {
        let connections = self.connections.read().await;
        connections.keys().copied().collect()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Notification, NotificationCategory};
    use chrono::Utc;
    use tokio::sync::mpsc;

    fn sample_frame(user_id: Uuid, unread_count: i64) -> RealtimeMessage {
        RealtimeMessage::notification(
            Notification {
                id: Uuid::new_v4(),
                user_id,
                category: NotificationCategory::Follow,
                title: "New follower".to_string(),
                body: "kreels_fan started following you".to_string(),
                data: None,
                image_url: None,
                actor_id: None,
                target_id: None,
                target_type: None,
                is_read: false,
                read_at: None,
                created_at: Utc::now(),
            },
            None,
            unread_count,
        )
    }

    #[tokio::test]
    async fn test_empty_manager() {
        let manager = ConnectionManager::new();
        assert_eq!(manager.total_connections().await, 0);
        assert_eq!(manager.connected_users_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_and_send() {
        let manager = ConnectionManager::new();
        let user_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();

        manager.subscribe(user_id, tx).await;
        assert_eq!(manager.connection_count(user_id).await, 1);

        let frame = sample_frame(user_id, 5);
        manager.send_to_user(user_id, frame.clone()).await;

        assert_eq!(rx.recv().await, Some(frame));
    }

    #[tokio::test]
    async fn test_multiple_connections_per_user() {
        let manager = ConnectionManager::new();
        let user_id = Uuid::new_v4();
        let mut receivers = Vec::new();

        for _ in 0..3 {
            let (tx, rx) = mpsc::unbounded_channel();
            manager.subscribe(user_id, tx).await;
            receivers.push(rx);
        }

        let frame = sample_frame(user_id, 1);
        manager.send_to_user(user_id, frame.clone()).await;

        for mut rx in receivers {
            assert_eq!(rx.recv().await, Some(frame.clone()));
        }
    }

    #[tokio::test]
    async fn test_send_to_disconnected_user_is_noop() {
        let manager = ConnectionManager::new();
        let user_id = Uuid::new_v4();
        // No panic, no error
        manager.send_to_user(user_id, sample_frame(user_id, 0)).await;
    }

    #[tokio::test]
    async fn test_closed_channels_are_pruned() {
        let manager = ConnectionManager::new();
        let user_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        manager.subscribe(user_id, tx).await;
        drop(rx);

        manager.send_to_user(user_id, sample_frame(user_id, 0)).await;
        assert_eq!(manager.connection_count(user_id).await, 0);
        assert_eq!(manager.connected_users_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let manager = ConnectionManager::new();
        let user_id = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();

        manager.subscribe(user_id, tx).await;
        manager.unsubscribe(user_id).await;
        assert_eq!(manager.connection_count(user_id).await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_users() {
        let manager = ConnectionManager::new();
        let mut receivers = Vec::new();

        for _ in 0..3 {
            let (tx, rx) = mpsc::unbounded_channel();
            manager.subscribe(Uuid::new_v4(), tx).await;
            receivers.push(rx);
        }

        manager.ping_all().await;

        for mut rx in receivers {
            assert!(matches!(rx.recv().await, Some(RealtimeMessage::Ping { .. })));
        }
    }

    #[tokio::test]
    async fn test_connected_user_ids() {
        let manager = ConnectionManager::new();
        let user_ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        for user_id in &user_ids {
            let (tx, _rx) = mpsc::unbounded_channel();
            manager.subscribe(*user_id, tx).await;
        }

        let connected = manager.connected_user_ids().await;
        assert_eq!(connected.len(), 3);
        for user_id in user_ids {
            assert!(connected.contains(&user_id));
        }
    }
}
