use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification category enumeration
///
/// Every social action that can alert a user maps to exactly one category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationCategory {
    /// User started following
    Follow,
    /// User liked a video
    Like,
    /// User commented on a video
    Comment,
    /// User replied to a comment
    CommentReply,
    /// User mentioned in a comment
    Mention,
    /// Viewer sent a gift during a live stream
    GiftReceived,
    /// Invited to a challenge
    ChallengeInvite,
    /// Challenge finished / results available
    ChallengeComplete,
    /// Followed creator went live
    LiveStarting,
    /// Wallet credited (gift payout, top-up)
    WalletCredit,
    /// Wallet debited (gift sent, withdrawal)
    WalletDebit,
    /// Reminder to complete profile
    ProfileIncomplete,
    /// Badge earned
    BadgeEarned,
    /// Creator level increased
    LevelUp,
    /// Platform/system notification
    System,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Follow => "follow",
            NotificationCategory::Like => "like",
            NotificationCategory::Comment => "comment",
            NotificationCategory::CommentReply => "comment_reply",
            NotificationCategory::Mention => "mention",
            NotificationCategory::GiftReceived => "gift_received",
            NotificationCategory::ChallengeInvite => "challenge_invite",
            NotificationCategory::ChallengeComplete => "challenge_complete",
            NotificationCategory::LiveStarting => "live_starting",
            NotificationCategory::WalletCredit => "wallet_credit",
            NotificationCategory::WalletDebit => "wallet_debit",
            NotificationCategory::ProfileIncomplete => "profile_incomplete",
            NotificationCategory::BadgeEarned => "badge_earned",
            NotificationCategory::LevelUp => "level_up",
            NotificationCategory::System => "system",
        }
    }

    /// Parse a category from its storage representation.
    ///
    /// Unknown strings fall back to `System` so that rows written by a newer
    /// deployment still render on an older one.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "follow" => NotificationCategory::Follow,
            "like" => NotificationCategory::Like,
            "comment" => NotificationCategory::Comment,
            "comment_reply" => NotificationCategory::CommentReply,
            "mention" => NotificationCategory::Mention,
            "gift_received" => NotificationCategory::GiftReceived,
            "challenge_invite" => NotificationCategory::ChallengeInvite,
            "challenge_complete" => NotificationCategory::ChallengeComplete,
            "live_starting" => NotificationCategory::LiveStarting,
            "wallet_credit" => NotificationCategory::WalletCredit,
            "wallet_debit" => NotificationCategory::WalletDebit,
            "profile_incomplete" => NotificationCategory::ProfileIncomplete,
            "badge_earned" => NotificationCategory::BadgeEarned,
            "level_up" => NotificationCategory::LevelUp,
            _ => NotificationCategory::System,
        }
    }
}

/// Device platform for push tokens
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ios" => Platform::Ios,
            "web" => Platform::Web,
            _ => Platform::Android,
        }
    }
}

/// Core notification model
///
/// Owned by the recipient; immutable after creation except `is_read`/`read_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,

    /// Recipient user ID
    pub user_id: Uuid,

    /// Category of the triggering action
    pub category: NotificationCategory,

    /// Notification title
    pub title: String,

    /// Notification body (truncated at write time)
    pub body: String,

    /// Opaque payload for client-side routing
    pub data: Option<serde_json::Value>,

    /// Optional image URL
    pub image_url: Option<String>,

    /// User who triggered the notification (if any)
    pub actor_id: Option<Uuid>,

    /// Referenced object ID (video, comment, club, ...)
    pub target_id: Option<Uuid>,

    /// Referenced object type
    pub target_type: Option<String>,

    /// Read status
    pub is_read: bool,

    /// Timestamp when first marked as read
    pub read_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Display info for the triggering user, loaded for client rendering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorInfo {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Result of a successful notification write
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationDelivery {
    pub notification: Notification,
    pub actor: Option<ActorInfo>,
    /// Live count of unread rows for the recipient, recomputed per write
    pub unread_count: i64,
}

/// Per-user notification settings
///
/// One row per user, created lazily with all-enabled defaults on first read.
/// `in_app_enabled` gates the stored notification; `push_enabled` plus the
/// per-category flag gate the push attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationSettings {
    pub user_id: Uuid,
    pub in_app_enabled: bool,
    pub push_enabled: bool,
    pub push_follows: bool,
    pub push_likes: bool,
    pub push_comments: bool,
    pub push_gifts: bool,
    pub push_challenges: bool,
    pub push_live: bool,
    pub push_wallet: bool,
    pub push_profile_reminders: bool,
    /// Quiet hours window, minutes past midnight UTC. May wrap midnight.
    pub quiet_hours_start: Option<i32>,
    pub quiet_hours_end: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationSettings {
    /// All-enabled defaults used when no settings row exists yet
    pub fn defaults(user_id: Uuid) -> Self {
        Self {
            user_id,
            in_app_enabled: true,
            push_enabled: true,
            push_follows: true,
            push_likes: true,
            push_comments: true,
            push_gifts: true,
            push_challenges: true,
            push_live: true,
            push_wallet: true,
            push_profile_reminders: true,
            quiet_hours_start: None,
            quiet_hours_end: None,
            updated_at: Utc::now(),
        }
    }

    /// Map a category to its per-category push flag.
    ///
    /// The match is exhaustive on purpose: adding a category without deciding
    /// its flag is a compile error, not a silent "enabled" fallback.
    pub fn push_category_enabled(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::Follow => self.push_follows,
            NotificationCategory::Like => self.push_likes,
            NotificationCategory::Comment
            | NotificationCategory::CommentReply
            | NotificationCategory::Mention => self.push_comments,
            NotificationCategory::GiftReceived => self.push_gifts,
            NotificationCategory::ChallengeInvite | NotificationCategory::ChallengeComplete => {
                self.push_challenges
            }
            NotificationCategory::LiveStarting => self.push_live,
            NotificationCategory::WalletCredit | NotificationCategory::WalletDebit => {
                self.push_wallet
            }
            NotificationCategory::ProfileIncomplete => self.push_profile_reminders,
            // No dedicated flag; always delivered while push is enabled
            NotificationCategory::BadgeEarned
            | NotificationCategory::LevelUp
            | NotificationCategory::System => true,
        }
    }

    /// Whether a push may be attempted for this category
    pub fn push_allowed(&self, category: NotificationCategory) -> bool {
        self.push_enabled && self.push_category_enabled(category)
    }

    /// Whether `minutes_past_midnight` falls inside the quiet-hours window.
    ///
    /// Returns false when no complete window is configured. The window may
    /// wrap midnight (e.g. 22:00-08:00).
    pub fn in_quiet_hours(&self, minutes_past_midnight: i32) -> bool {
        match (self.quiet_hours_start, self.quiet_hours_end) {
            (Some(start), Some(end)) if start != end => {
                if start < end {
                    minutes_past_midnight >= start && minutes_past_midnight < end
                } else {
                    minutes_past_midnight >= start || minutes_past_midnight < end
                }
            }
            _ => false,
        }
    }
}

/// Push token for a registered device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushToken {
    pub id: Uuid,

    pub user_id: Uuid,

    /// Opaque provider token, unique across all users
    pub token: String,

    pub platform: Platform,

    /// Client-generated device identifier
    pub device_id: Option<String>,

    /// Deactivated (never deleted) on logout or provider rejection
    pub is_active: bool,

    pub last_used_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

/// Request to write a notification for one recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteNotification {
    pub user_id: Uuid,
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub image_url: Option<String>,
    pub actor_id: Option<Uuid>,
    pub target_id: Option<Uuid>,
    pub target_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        let categories = [
            NotificationCategory::Follow,
            NotificationCategory::Like,
            NotificationCategory::Comment,
            NotificationCategory::CommentReply,
            NotificationCategory::Mention,
            NotificationCategory::GiftReceived,
            NotificationCategory::ChallengeInvite,
            NotificationCategory::ChallengeComplete,
            NotificationCategory::LiveStarting,
            NotificationCategory::WalletCredit,
            NotificationCategory::WalletDebit,
            NotificationCategory::ProfileIncomplete,
            NotificationCategory::BadgeEarned,
            NotificationCategory::LevelUp,
            NotificationCategory::System,
        ];

        for category in categories {
            assert_eq!(NotificationCategory::parse(category.as_str()), category);
        }
    }

    #[test]
    fn test_category_parse_unknown_falls_back_to_system() {
        assert_eq!(
            NotificationCategory::parse("duet_request"),
            NotificationCategory::System
        );
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!(Platform::parse("ios"), Platform::Ios);
        assert_eq!(Platform::parse("IOS"), Platform::Ios);
        assert_eq!(Platform::parse("web"), Platform::Web);
        assert_eq!(Platform::parse("android"), Platform::Android);
        assert_eq!(Platform::parse("unknown"), Platform::Android);
    }

    #[test]
    fn test_push_category_mapping() {
        let mut settings = NotificationSettings::defaults(Uuid::new_v4());
        settings.push_comments = false;
        settings.push_wallet = false;

        assert!(!settings.push_category_enabled(NotificationCategory::Comment));
        assert!(!settings.push_category_enabled(NotificationCategory::CommentReply));
        assert!(!settings.push_category_enabled(NotificationCategory::Mention));
        assert!(!settings.push_category_enabled(NotificationCategory::WalletCredit));
        assert!(settings.push_category_enabled(NotificationCategory::Follow));
        assert!(settings.push_category_enabled(NotificationCategory::BadgeEarned));
    }

    #[test]
    fn test_push_allowed_requires_global_flag() {
        let mut settings = NotificationSettings::defaults(Uuid::new_v4());
        settings.push_enabled = false;

        assert!(!settings.push_allowed(NotificationCategory::Follow));
        assert!(settings.push_category_enabled(NotificationCategory::Follow));
    }

    #[test]
    fn test_quiet_hours_plain_window() {
        let mut settings = NotificationSettings::defaults(Uuid::new_v4());
        settings.quiet_hours_start = Some(8 * 60);
        settings.quiet_hours_end = Some(17 * 60);

        assert!(settings.in_quiet_hours(12 * 60));
        assert!(!settings.in_quiet_hours(17 * 60));
        assert!(!settings.in_quiet_hours(7 * 60));
    }

    #[test]
    fn test_quiet_hours_wrapping_midnight() {
        let mut settings = NotificationSettings::defaults(Uuid::new_v4());
        settings.quiet_hours_start = Some(22 * 60);
        settings.quiet_hours_end = Some(8 * 60);

        assert!(settings.in_quiet_hours(23 * 60));
        assert!(settings.in_quiet_hours(3 * 60));
        assert!(!settings.in_quiet_hours(12 * 60));
    }

    #[test]
    fn test_quiet_hours_unset() {
        let settings = NotificationSettings::defaults(Uuid::new_v4());
        assert!(!settings.in_quiet_hours(0));
        assert!(!settings.in_quiet_hours(12 * 60));
    }

    #[test]
    fn test_settings_defaults_all_enabled() {
        let settings = NotificationSettings::defaults(Uuid::new_v4());
        assert!(settings.in_app_enabled);
        assert!(settings.push_enabled);
        assert!(settings.push_allowed(NotificationCategory::GiftReceived));
        assert!(settings.push_allowed(NotificationCategory::LiveStarting));
    }
}
