//! Database models for per-user notification settings.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::UserId;

/// Database row for a user's notification settings. One row per user.
#[derive(Debug, Clone, FromRow)]
pub struct UserSettings {
    pub id: Uuid,
    pub user_id: UserId,
    pub slack_webhook_url: Option<String>,
    pub notification_enabled: bool,
    pub notification_days_before: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert request for user settings. `None` fields keep their stored value
/// (or the column default when the row is being created).
#[derive(Debug, Clone, Default)]
pub struct UserSettingsUpsertDBRequest {
    pub slack_webhook_url: Option<String>,
    pub notification_enabled: Option<bool>,
    pub notification_days_before: Option<Vec<i32>>,
}
