/// Push dispatcher
///
/// Best-effort delivery of a stored notification to a user's devices. Nothing
/// here returns an error to the caller: the notification row is already
/// committed, and a push failure must never affect it. Failures are logged
/// and counted, malformed tokens are dropped, and a chunk failure never
/// aborts the other chunks.
use crate::metrics;
use crate::models::{NotificationCategory, NotificationSettings, PushToken};
use crate::services::push_provider::{PushMessage, PushProvider};
use crate::services::NotificationService;
use chrono::{Timelike, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct PushDispatcher {
    service: Arc<NotificationService>,
    provider: Arc<dyn PushProvider>,
}

impl PushDispatcher {
    pub fn new(service: Arc<NotificationService>, provider: Arc<dyn PushProvider>) -> Self {
        Self { service, provider }
    }

    /// Attempt push delivery for one recipient.
    ///
    /// Steps: re-check the push gates, load active tokens, drop malformed
    /// tokens, chunk to the provider batch size, send each chunk, inspect
    /// tickets. Tokens the provider reports as unregistered are deactivated.
    pub async fn dispatch(
        &self,
        user_id: Uuid,
        category: NotificationCategory,
        title: &str,
        body: &str,
        data: Option<serde_json::Value>,
        badge: Option<i64>,
    ) {
        let settings = match self.service.get_settings(user_id).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("push skipped for user {}: settings load failed: {}", user_id, e);
                return;
            }
        };

        let now = Utc::now();
        let minutes = (now.hour() * 60 + now.minute()) as i32;
        if !push_permitted(&settings, category, minutes) {
            debug!(
                "push gated off for user {} category {}",
                user_id,
                category.as_str()
            );
            return;
        }

        let tokens = match self.service.active_tokens(user_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("push skipped for user {}: token load failed: {}", user_id, e);
                return;
            }
        };

        let valid_tokens = collect_valid_tokens(self.provider.as_ref(), user_id, tokens);
        if valid_tokens.is_empty() {
            debug!("no active push tokens for user {}", user_id);
            return;
        }

        let messages = build_messages(&valid_tokens, title, body, data, badge);
        let report = send_chunks(self.provider.as_ref(), user_id, &messages).await;

        for token in &report.stale {
            if let Err(e) = self.service.deactivate_token_value(token).await {
                warn!("failed to deactivate stale token: {}", e);
            }
        }
        if let Err(e) = self.service.touch_tokens(&report.delivered).await {
            warn!("failed to update token last_used_at: {}", e);
        }
    }
}

/// Push gate re-check at dispatch time: category flags plus quiet hours.
/// The in-app write has its own gate; this one only guards the push leg.
fn push_permitted(
    settings: &NotificationSettings,
    category: NotificationCategory,
    minutes_now: i32,
) -> bool {
    settings.push_allowed(category) && !settings.in_quiet_hours(minutes_now)
}

/// Keep only tokens the provider recognizes; malformed ones are logged,
/// counted, and never sent.
fn collect_valid_tokens(
    provider: &dyn PushProvider,
    user_id: Uuid,
    tokens: Vec<PushToken>,
) -> Vec<String> {
    let mut valid = Vec::new();
    for push_token in tokens {
        if provider.is_valid_token(&push_token.token) {
            valid.push(push_token.token);
        } else {
            warn!(
                "dropping malformed push token for user {} (id {})",
                user_id, push_token.id
            );
            metrics::observe_push_ticket("malformed");
        }
    }
    valid
}

fn build_messages(
    tokens: &[String],
    title: &str,
    body: &str,
    data: Option<serde_json::Value>,
    badge: Option<i64>,
) -> Vec<PushMessage> {
    tokens
        .iter()
        .map(|token| PushMessage {
            to: token.clone(),
            title: title.to_string(),
            body: body.to_string(),
            data: data.clone(),
            badge,
        })
        .collect()
}

/// What happened across all chunks of one dispatch
#[derive(Debug, Default)]
struct DeliveryReport {
    /// Tokens whose tickets came back ok
    delivered: Vec<String>,
    /// Tokens the provider reported as unregistered
    stale: Vec<String>,
}

/// Send messages in provider-sized chunks and fold the tickets into a report.
/// A failed chunk is counted and skipped; the remaining chunks still go out.
async fn send_chunks(
    provider: &dyn PushProvider,
    user_id: Uuid,
    messages: &[PushMessage],
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for chunk in messages.chunks(provider.batch_size().max(1)) {
        match provider.send_batch(chunk).await {
            Ok(tickets) => {
                for ticket in tickets {
                    if ticket.is_ok() {
                        metrics::observe_push_ticket("ok");
                        report.delivered.push(ticket.token);
                    } else {
                        metrics::observe_push_ticket("error");
                        warn!(
                            "push ticket error for user {}: {}",
                            user_id,
                            ticket.error.as_deref().unwrap_or("unknown")
                        );
                        if ticket.token_unregistered() {
                            report.stale.push(ticket.token);
                        }
                    }
                }
            }
            Err(e) => {
                // One failed chunk must not stop the rest
                metrics::observe_push_ticket("chunk_failed");
                warn!("push chunk failed for user {}: {}", user_id, e);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::push_provider::PushTicket;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider double that records batches, fails on demand, and reports
    /// chosen tokens as unregistered
    struct FakeProvider {
        batch_size: usize,
        fail_batches: Vec<usize>,
        unregistered: Vec<String>,
        sent: Mutex<Vec<Vec<PushMessage>>>,
    }

    impl FakeProvider {
        fn new(batch_size: usize, fail_batches: Vec<usize>) -> Self {
            Self {
                batch_size,
                fail_batches,
                unregistered: Vec::new(),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn with_unregistered(mut self, tokens: Vec<String>) -> Self {
            self.unregistered = tokens;
            self
        }
    }

    #[async_trait]
    impl PushProvider for FakeProvider {
        fn is_valid_token(&self, token: &str) -> bool {
            token.starts_with("ExponentPushToken[")
        }

        fn batch_size(&self) -> usize {
            self.batch_size
        }

        async fn send_batch(&self, messages: &[PushMessage]) -> Result<Vec<PushTicket>, String> {
            let mut sent = self.sent.lock().unwrap();
            let index = sent.len();
            sent.push(messages.to_vec());
            if self.fail_batches.contains(&index) {
                return Err("provider unavailable".to_string());
            }
            Ok(messages
                .iter()
                .map(|m| {
                    if self.unregistered.contains(&m.to) {
                        PushTicket {
                            token: m.to.clone(),
                            message_id: None,
                            error: Some("DeviceNotRegistered".to_string()),
                        }
                    } else {
                        PushTicket {
                            token: m.to.clone(),
                            message_id: Some("id".to_string()),
                            error: None,
                        }
                    }
                })
                .collect())
        }
    }

    fn token_row(token: &str) -> PushToken {
        use crate::models::Platform;
        use chrono::Utc;
        PushToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: token.to_string(),
            platform: Platform::Ios,
            device_id: None,
            is_active: true,
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    fn messages_for(tokens: &[&str]) -> Vec<PushMessage> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        build_messages(&tokens, "t", "b", None, None)
    }

    #[test]
    fn test_gate_recheck_blocks_disabled_category() {
        let mut settings = NotificationSettings::defaults(Uuid::new_v4());
        settings.push_follows = false;

        assert!(!push_permitted(&settings, NotificationCategory::Follow, 600));
        assert!(push_permitted(&settings, NotificationCategory::Like, 600));
    }

    #[test]
    fn test_quiet_hours_block_push() {
        let mut settings = NotificationSettings::defaults(Uuid::new_v4());
        settings.quiet_hours_start = Some(1320); // 22:00
        settings.quiet_hours_end = Some(480); // 08:00

        // 23:00 is inside the window, 12:00 is not
        assert!(!push_permitted(&settings, NotificationCategory::Like, 1380));
        assert!(push_permitted(&settings, NotificationCategory::Like, 720));
    }

    #[test]
    fn test_malformed_tokens_dropped_before_send() {
        let provider = FakeProvider::new(100, vec![]);
        let tokens = vec![
            token_row("ExponentPushToken[good-1]"),
            token_row("fcm-legacy-junk"),
            token_row("ExponentPushToken[good-2]"),
        ];

        let valid = collect_valid_tokens(&provider, Uuid::new_v4(), tokens);
        assert_eq!(
            valid,
            vec![
                "ExponentPushToken[good-1]".to_string(),
                "ExponentPushToken[good-2]".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_chunking_respects_batch_size() {
        let provider = FakeProvider::new(2, vec![]);
        let tokens: Vec<String> = (0..5).map(|i| format!("ExponentPushToken[t{}]", i)).collect();
        let messages = build_messages(&tokens, "t", "b", None, None);

        let report = send_chunks(&provider, Uuid::new_v4(), &messages).await;

        let sent = provider.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].len(), 2);
        assert_eq!(sent[2].len(), 1);
        assert_eq!(report.delivered.len(), 5);
        assert!(report.stale.is_empty());
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_stop_others() {
        let provider = FakeProvider::new(1, vec![1]);
        let messages = messages_for(&[
            "ExponentPushToken[t0]",
            "ExponentPushToken[t1]",
            "ExponentPushToken[t2]",
        ]);

        let report = send_chunks(&provider, Uuid::new_v4(), &messages).await;

        // All three chunks were attempted; only the failed one is missing
        // from the delivered list.
        assert_eq!(provider.sent.lock().unwrap().len(), 3);
        assert_eq!(
            report.delivered,
            vec![
                "ExponentPushToken[t0]".to_string(),
                "ExponentPushToken[t2]".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_unregistered_ticket_marks_token_stale() {
        let provider = FakeProvider::new(100, vec![])
            .with_unregistered(vec!["ExponentPushToken[gone]".to_string()]);
        let messages = messages_for(&["ExponentPushToken[alive]", "ExponentPushToken[gone]"]);

        let report = send_chunks(&provider, Uuid::new_v4(), &messages).await;

        assert_eq!(report.delivered, vec!["ExponentPushToken[alive]".to_string()]);
        assert_eq!(report.stale, vec!["ExponentPushToken[gone]".to_string()]);
    }
}
