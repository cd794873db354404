//! API models for notification history and checks.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::notification_history::NotificationRecord;
use crate::notifications::CheckOutcome;
use crate::types::{NotificationId, NotificationStatus, SubscriptionId, UserId};

/// Recorded notification attempt as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: NotificationId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub subscription_id: SubscriptionId,
    pub notification_date: NaiveDate,
    pub days_before_billing: i32,
    pub status: NotificationStatus,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRecord> for NotificationResponse {
    fn from(row: NotificationRecord) -> Self {
        let status = row.notification_status();
        Self {
            id: row.id,
            user_id: row.user_id,
            subscription_id: row.subscription_id,
            notification_date: row.notification_date,
            days_before_billing: row.days_before_billing,
            status,
            error_message: row.error_message,
            retry_count: row.retry_count,
            created_at: row.created_at,
        }
    }
}

/// Optional body for the on-demand check endpoint.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CheckRequest {
    /// Day offsets to use when the user has no stored offsets
    pub days_before: Option<Vec<i32>>,
}

/// Response of the webhook test endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct TestNotificationResponse {
    pub message: String,
    pub check: CheckOutcome,
}
