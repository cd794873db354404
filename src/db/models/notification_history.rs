//! Database models for the notification dedup ledger.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::types::{NotificationId, NotificationStatus, SubscriptionId, UserId};

/// Database row for a recorded notification attempt. The unique constraint on
/// (subscription_id, notification_date, days_before_billing) makes this table
/// the duplicate-send guard.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
    pub notification_date: NaiveDate,
    pub days_before_billing: i32,
    pub status: String,
    pub slack_webhook_url: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Typed status; unknown values read as `failed`.
    pub fn notification_status(&self) -> NotificationStatus {
        self.status.parse().unwrap_or(NotificationStatus::Failed)
    }
}

/// Request to record a notification attempt.
#[derive(Debug, Clone)]
pub struct NotificationRecordCreateDBRequest {
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
    pub notification_date: NaiveDate,
    pub days_before_billing: i32,
    pub status: NotificationStatus,
    pub slack_webhook_url: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i32,
}
