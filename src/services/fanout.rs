/// Fan-out orchestrator
///
/// Turns one triggering event into per-recipient notification writes plus
/// best-effort push and realtime delivery. Recipients are independent: the
/// whole set is awaited with settle semantics, so one recipient's failure
/// never cancels or rolls back any other recipient's notification. No
/// ordering guarantee across recipients.
use crate::error::AppResult;
use crate::metrics;
use crate::models::{NotificationCategory, NotificationDelivery, WriteNotification};
use crate::realtime::{ConnectionManager, RealtimeMessage};
use crate::services::{NotificationService, PushDispatcher};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-recipient outcome, collected rather than propagated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Notification row written (push/relay attempted)
    Delivered,
    /// In-app gate closed; deliberate no-op
    Skipped,
    /// Persistence failure for this recipient only
    Failed,
}

/// Aggregate result of a fan-out run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FanoutSummary {
    pub recipients: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl FanoutSummary {
    fn from_outcomes(outcomes: &[Outcome]) -> Self {
        Self {
            recipients: outcomes.len(),
            delivered: outcomes.iter().filter(|o| **o == Outcome::Delivered).count(),
            skipped: outcomes.iter().filter(|o| **o == Outcome::Skipped).count(),
            failed: outcomes.iter().filter(|o| **o == Outcome::Failed).count(),
        }
    }
}

pub struct FanoutService {
    db: PgPool,
    service: Arc<NotificationService>,
    dispatcher: Arc<PushDispatcher>,
    relay: Arc<ConnectionManager>,
}

impl FanoutService {
    pub fn new(
        db: PgPool,
        service: Arc<NotificationService>,
        dispatcher: Arc<PushDispatcher>,
        relay: Arc<ConnectionManager>,
    ) -> Self {
        Self {
            db,
            service,
            dispatcher,
            relay,
        }
    }

    /// Notify a single recipient: persist, then push + relay in parallel.
    ///
    /// Returns `None` when the recipient's in-app gate is closed. Push and
    /// relay are best-effort; only the persistence failure is caller-visible.
    pub async fn notify_user(
        &self,
        req: WriteNotification,
    ) -> AppResult<Option<NotificationDelivery>> {
        let user_id = req.user_id;
        let category = req.category;

        let delivery = match self.service.write(req).await? {
            Some(delivery) => delivery,
            None => return Ok(None),
        };

        metrics::observe_notification_written(category.as_str());

        let push = self.dispatcher.dispatch(
            user_id,
            category,
            &delivery.notification.title,
            &delivery.notification.body,
            delivery.notification.data.clone(),
            Some(delivery.unread_count),
        );
        let relay = self.relay.send_to_user(
            user_id,
            RealtimeMessage::notification(
                delivery.notification.clone(),
                delivery.actor.clone(),
                delivery.unread_count,
            ),
        );
        tokio::join!(push, relay);

        Ok(Some(delivery))
    }

    /// Notify every follower of a creator
    pub async fn notify_followers(
        &self,
        creator_id: Uuid,
        category: NotificationCategory,
        title: &str,
        body: &str,
        data: Option<serde_json::Value>,
        image_url: Option<String>,
    ) -> AppResult<FanoutSummary> {
        let recipients = self.follower_ids(creator_id).await?;
        let summary = self
            .fan_out(
                recipients,
                Some(creator_id),
                category,
                title,
                body,
                data,
                image_url,
            )
            .await;

        info!(
            "follower fan-out for creator {}: {} recipients, {} delivered, {} skipped, {} failed",
            creator_id, summary.recipients, summary.delivered, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Notify every member of a club except the triggering user
    pub async fn notify_club_members(
        &self,
        club_id: Uuid,
        exclude_user_id: Option<Uuid>,
        category: NotificationCategory,
        title: &str,
        body: &str,
        data: Option<serde_json::Value>,
    ) -> AppResult<FanoutSummary> {
        let recipients = self.club_member_ids(club_id, exclude_user_id).await?;
        let summary = self
            .fan_out(recipients, exclude_user_id, category, title, body, data, None)
            .await;

        info!(
            "club fan-out for club {}: {} recipients, {} delivered, {} skipped, {} failed",
            club_id, summary.recipients, summary.delivered, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Launch one delivery per recipient and settle them all.
    ///
    /// Errors are collected per recipient; nothing is fail-fast.
    async fn fan_out(
        &self,
        recipients: Vec<Uuid>,
        actor_id: Option<Uuid>,
        category: NotificationCategory,
        title: &str,
        body: &str,
        data: Option<serde_json::Value>,
        image_url: Option<String>,
    ) -> FanoutSummary {
        let tasks = recipients.into_iter().map(|user_id| {
            let req = WriteNotification {
                user_id,
                category,
                title: title.to_string(),
                body: body.to_string(),
                data: data.clone(),
                image_url: image_url.clone(),
                actor_id,
                target_id: None,
                target_type: None,
            };
            async move {
                match self.notify_user(req).await {
                    Ok(Some(_)) => Outcome::Delivered,
                    Ok(None) => Outcome::Skipped,
                    Err(e) => {
                        warn!("fan-out delivery failed for user {}: {}", user_id, e);
                        Outcome::Failed
                    }
                }
            }
        });

        let outcomes = join_all(tasks).await;
        FanoutSummary::from_outcomes(&outcomes)
    }

    async fn follower_ids(&self, creator_id: Uuid) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT follower_id FROM follows WHERE followee_id = $1")
            .bind(creator_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.iter().map(|row| row.get("follower_id")).collect())
    }

    async fn club_member_ids(
        &self,
        club_id: Uuid,
        exclude_user_id: Option<Uuid>,
    ) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id FROM club_members
            WHERE club_id = $1 AND ($2::uuid IS NULL OR user_id != $2)
            "#,
        )
        .bind(club_id)
        .bind(exclude_user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_outcomes() {
        let outcomes = [
            Outcome::Delivered,
            Outcome::Delivered,
            Outcome::Skipped,
            Outcome::Failed,
        ];
        let summary = FanoutSummary::from_outcomes(&outcomes);
        assert_eq!(summary.recipients, 4);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_summary_empty() {
        let summary = FanoutSummary::from_outcomes(&[]);
        assert_eq!(summary.recipients, 0);
        assert_eq!(summary.delivered, 0);
    }

    #[tokio::test]
    async fn test_settle_semantics_one_failure_does_not_cancel_siblings() {
        // Settle the same way fan_out does: every branch resolves to an
        // outcome, a failed branch never aborts the join.
        let tasks = (0..5).map(|i| async move {
            if i == 2 {
                Outcome::Failed
            } else {
                Outcome::Delivered
            }
        });
        let outcomes = join_all(tasks).await;
        let summary = FanoutSummary::from_outcomes(&outcomes);
        assert_eq!(summary.delivered, 4);
        assert_eq!(summary.failed, 1);
    }
}
