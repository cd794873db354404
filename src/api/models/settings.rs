//! API models for per-user notification settings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::settings::{UserSettings, UserSettingsUpsertDBRequest};
use crate::types::UserId;

/// Upsert request for user settings; absent fields keep their stored values.
/// Setting a webhook URL re-enables notifications unless `notification_enabled`
/// is passed explicitly.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UserSettingsUpdate {
    pub slack_webhook_url: Option<String>,
    pub notification_enabled: Option<bool>,
    pub notification_days_before: Option<Vec<i32>>,
}

impl From<UserSettingsUpdate> for UserSettingsUpsertDBRequest {
    fn from(update: UserSettingsUpdate) -> Self {
        Self {
            slack_webhook_url: update.slack_webhook_url,
            notification_enabled: update.notification_enabled,
            notification_days_before: update.notification_days_before,
        }
    }
}

/// Settings as returned by the API. Users without a stored row get defaults.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSettingsResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub slack_webhook_url: Option<String>,
    pub notification_enabled: bool,
    pub notification_days_before: Vec<i32>,
}

impl UserSettingsResponse {
    /// Defaults returned when no row exists yet.
    pub fn defaults(user_id: UserId, default_days_before: &[i32]) -> Self {
        Self {
            user_id,
            slack_webhook_url: None,
            notification_enabled: true,
            notification_days_before: default_days_before.to_vec(),
        }
    }
}

impl From<UserSettings> for UserSettingsResponse {
    fn from(row: UserSettings) -> Self {
        Self {
            user_id: row.user_id,
            slack_webhook_url: row.slack_webhook_url,
            notification_enabled: row.notification_enabled,
            notification_days_before: row.notification_days_before,
        }
    }
}
