/// Notification writer and preference store
///
/// Persists notification rows, manages per-user settings (created lazily with
/// all-enabled defaults), and owns the push-token registry. Push delivery and
/// the realtime relay are invoked by the caller, never from inside the write
/// path, so a delivery failure cannot roll back a stored notification.
use crate::error::{AppError, AppResult};
use crate::models::{
    ActorInfo, Notification, NotificationCategory, NotificationDelivery, NotificationSettings,
    Platform, PushToken, WriteNotification,
};
use chrono::Utc;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

/// Stored notification bodies are cut at this many characters
const MAX_BODY_CHARS: usize = 50;

pub struct NotificationService {
    db: PgPool,
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Persist a notification for one recipient.
    ///
    /// Returns `None` without touching the database when the recipient's
    /// in-app gate is closed. On success the returned delivery carries actor
    /// display info and the recomputed unread count.
    pub async fn write(
        &self,
        req: WriteNotification,
    ) -> AppResult<Option<NotificationDelivery>> {
        let settings = self.get_settings(req.user_id).await?;
        if !settings.in_app_enabled {
            debug!(
                "in-app notifications disabled for user {}, skipping {}",
                req.user_id,
                req.category.as_str()
            );
            return Ok(None);
        }

        let notification_id = Uuid::new_v4();
        let now = Utc::now();
        let body = truncate_body(&req.body, MAX_BODY_CHARS);

        let query = r#"
            INSERT INTO notifications (
                id, user_id, category, title, body, data, image_url,
                actor_id, target_id, target_type, is_read, created_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false, $11
            )
            RETURNING id, user_id, category, title, body, data, image_url,
                      actor_id, target_id, target_type, is_read, read_at, created_at
        "#;

        let row = sqlx::query(query)
            .bind(notification_id)
            .bind(req.user_id)
            .bind(req.category.as_str())
            .bind(&req.title)
            .bind(&body)
            .bind(&req.data)
            .bind(&req.image_url)
            .bind(req.actor_id)
            .bind(req.target_id)
            .bind(&req.target_type)
            .bind(now)
            .fetch_one(&self.db)
            .await?;

        let notification = Self::row_to_notification(&row);

        let actor = match req.actor_id {
            Some(actor_id) => self.get_actor(actor_id).await?,
            None => None,
        };

        let unread_count = self.unread_count(req.user_id).await?;

        info!(
            "created notification {} ({}) for user {}",
            notification_id,
            req.category.as_str(),
            req.user_id
        );

        Ok(Some(NotificationDelivery {
            notification,
            actor,
            unread_count,
        }))
    }

    /// Live count of unread rows; recomputed every time, never cached
    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.get("count"))
    }

    /// Paged notification list, newest first
    pub async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Notification>> {
        let query = r#"
            SELECT id, user_id, category, title, body, data, image_url,
                   actor_id, target_id, target_type, is_read, read_at, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(limit.clamp(1, 100))
            .bind(offset.max(0))
            .fetch_all(&self.db)
            .await?;

        Ok(rows.iter().map(Self::row_to_notification).collect())
    }

    /// Mark one notification read, scoped to its owner.
    ///
    /// Idempotent: re-invocation keeps the original read_at.
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = COALESCE(read_at, $1)
            WHERE id = $2 AND user_id = $3
            "#,
        )
        .bind(Utc::now())
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Mark every unread notification read; already-read rows keep read_at
    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = COALESCE(read_at, $1)
            WHERE user_id = $2 AND is_read = false
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete a notification on explicit user action
    pub async fn delete_notification(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Get a user's settings, creating the all-enabled default row on first read
    pub async fn get_settings(&self, user_id: Uuid) -> AppResult<NotificationSettings> {
        let query = r#"
            SELECT user_id, in_app_enabled, push_enabled, push_follows, push_likes,
                   push_comments, push_gifts, push_challenges, push_live, push_wallet,
                   push_profile_reminders, quiet_hours_start, quiet_hours_end, updated_at
            FROM notification_settings
            WHERE user_id = $1
        "#;

        match sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
        {
            Some(row) => Ok(Self::row_to_settings(&row)),
            None => {
                let defaults = NotificationSettings::defaults(user_id);

                // Concurrent first reads race here; the conflict clause makes
                // the insert a no-op for the loser.
                sqlx::query(
                    r#"
                    INSERT INTO notification_settings (
                        user_id, in_app_enabled, push_enabled, push_follows, push_likes,
                        push_comments, push_gifts, push_challenges, push_live, push_wallet,
                        push_profile_reminders, updated_at
                    ) VALUES ($1, true, true, true, true, true, true, true, true, true, true, $2)
                    ON CONFLICT (user_id) DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(defaults.updated_at)
                .execute(&self.db)
                .await?;

                Ok(defaults)
            }
        }
    }

    /// Persist updated settings and return the stored row
    pub async fn update_settings(
        &self,
        settings: &NotificationSettings,
    ) -> AppResult<NotificationSettings> {
        let query = r#"
            UPDATE notification_settings
            SET in_app_enabled = $2, push_enabled = $3, push_follows = $4,
                push_likes = $5, push_comments = $6, push_gifts = $7,
                push_challenges = $8, push_live = $9, push_wallet = $10,
                push_profile_reminders = $11, quiet_hours_start = $12,
                quiet_hours_end = $13, updated_at = $14
            WHERE user_id = $1
            RETURNING user_id, in_app_enabled, push_enabled, push_follows, push_likes,
                      push_comments, push_gifts, push_challenges, push_live, push_wallet,
                      push_profile_reminders, quiet_hours_start, quiet_hours_end, updated_at
        "#;

        let row = sqlx::query(query)
            .bind(settings.user_id)
            .bind(settings.in_app_enabled)
            .bind(settings.push_enabled)
            .bind(settings.push_follows)
            .bind(settings.push_likes)
            .bind(settings.push_comments)
            .bind(settings.push_gifts)
            .bind(settings.push_challenges)
            .bind(settings.push_live)
            .bind(settings.push_wallet)
            .bind(settings.push_profile_reminders)
            .bind(settings.quiet_hours_start)
            .bind(settings.quiet_hours_end)
            .bind(Utc::now())
            .fetch_one(&self.db)
            .await?;

        Ok(Self::row_to_settings(&row))
    }

    /// Register (or reactivate) a device push token.
    ///
    /// Tokens are unique platform-wide; a token re-registered from a new
    /// account moves to that account.
    pub async fn register_push_token(
        &self,
        user_id: Uuid,
        token: String,
        platform: Platform,
        device_id: Option<String>,
    ) -> AppResult<Uuid> {
        let token_id = Uuid::new_v4();
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO push_tokens (
                id, user_id, token, platform, device_id, is_active, last_used_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, true, $6, $6)
            ON CONFLICT (token) DO UPDATE
            SET user_id = $2, platform = $4, device_id = $5,
                is_active = true, last_used_at = $6
            RETURNING id
            "#,
        )
        .bind(token_id)
        .bind(user_id)
        .bind(&token)
        .bind(platform.as_str())
        .bind(&device_id)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        let registered_id: Uuid = row.get("id");
        info!("registered push token for user {}", user_id);
        Ok(registered_id)
    }

    /// Deactivate a token on logout; the row is kept for audit
    pub async fn deactivate_push_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE push_tokens SET is_active = false WHERE user_id = $1 AND token = $2",
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.db)
        .await?;

        debug!("deactivated push token for user {}", user_id);
        Ok(())
    }

    /// Deactivate a token the provider reported as unregistered
    pub async fn deactivate_token_value(&self, token: &str) -> AppResult<()> {
        sqlx::query("UPDATE push_tokens SET is_active = false WHERE token = $1")
            .bind(token)
            .execute(&self.db)
            .await?;

        info!("deactivated unregistered push token");
        Ok(())
    }

    /// All active tokens for a user
    pub async fn active_tokens(&self, user_id: Uuid) -> AppResult<Vec<PushToken>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, token, platform, device_id, is_active, last_used_at, created_at
            FROM push_tokens
            WHERE user_id = $1 AND is_active = true
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let platform_str: String = row.get("platform");
                PushToken {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    token: row.get("token"),
                    platform: Platform::parse(&platform_str),
                    device_id: row.get("device_id"),
                    is_active: row.get("is_active"),
                    last_used_at: row.get("last_used_at"),
                    created_at: row.get("created_at"),
                }
            })
            .collect())
    }

    /// Record that tokens accepted a delivery
    pub async fn touch_tokens(&self, tokens: &[String]) -> AppResult<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE push_tokens SET last_used_at = $1 WHERE token = ANY($2)")
            .bind(Utc::now())
            .bind(tokens)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Load actor display info for client rendering
    pub async fn get_actor(&self, actor_id: Uuid) -> AppResult<Option<ActorInfo>> {
        let row = sqlx::query("SELECT id, username, avatar_url FROM users WHERE id = $1")
            .bind(actor_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|row| ActorInfo {
            id: row.get("id"),
            username: row.get("username"),
            avatar_url: row.get("avatar_url"),
        }))
    }

    fn row_to_notification(row: &sqlx::postgres::PgRow) -> Notification {
        let category_str: String = row.get("category");
        Notification {
            id: row.get("id"),
            user_id: row.get("user_id"),
            category: NotificationCategory::parse(&category_str),
            title: row.get("title"),
            body: row.get("body"),
            data: row.get("data"),
            image_url: row.get("image_url"),
            actor_id: row.get("actor_id"),
            target_id: row.get("target_id"),
            target_type: row.get("target_type"),
            is_read: row.get("is_read"),
            read_at: row.get("read_at"),
            created_at: row.get("created_at"),
        }
    }

    fn row_to_settings(row: &sqlx::postgres::PgRow) -> NotificationSettings {
        NotificationSettings {
            user_id: row.get("user_id"),
            in_app_enabled: row.get("in_app_enabled"),
            push_enabled: row.get("push_enabled"),
            push_follows: row.get("push_follows"),
            push_likes: row.get("push_likes"),
            push_comments: row.get("push_comments"),
            push_gifts: row.get("push_gifts"),
            push_challenges: row.get("push_challenges"),
            push_live: row.get("push_live"),
            push_wallet: row.get("push_wallet"),
            push_profile_reminders: row.get("push_profile_reminders"),
            quiet_hours_start: row.get("quiet_hours_start"),
            quiet_hours_end: row.get("quiet_hours_end"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// Cut a body at `max_chars` characters, appending an ellipsis.
///
/// Operates on chars, not bytes, so multi-byte text never splits mid-glyph.
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        body.to_string()
    } else {
        let mut truncated: String = body.chars().take(max_chars).collect();
        truncated.push('…');
        truncated
    }
}
