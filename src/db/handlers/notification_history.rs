//! Repository for the notification dedup ledger.

use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::{DbError, Result},
    models::notification_history::{NotificationRecord, NotificationRecordCreateDBRequest},
};
use crate::types::{SubscriptionId, UserId, abbrev_uuid};

pub struct NotificationHistory<'c> {
    db: &'c mut PgConnection,
}

impl<'c> NotificationHistory<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Whether a reminder was already successfully sent for this subscription,
    /// day, and offset. Failed attempts do not count; they may be retried on a
    /// later sweep.
    #[instrument(skip(self), fields(subscription_id = %abbrev_uuid(&subscription_id)), err)]
    pub async fn was_sent(
        &mut self,
        subscription_id: SubscriptionId,
        notification_date: NaiveDate,
        days_before_billing: i32,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification_history
             WHERE subscription_id = $1 AND notification_date = $2
               AND days_before_billing = $3 AND status = 'sent'",
        )
        .bind(subscription_id)
        .bind(notification_date)
        .bind(days_before_billing)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count > 0)
    }

    /// Record an attempt. Returns None when another sweep already recorded the
    /// same (subscription, date, offset) tuple; any other failure is an error.
    #[instrument(
        skip(self, request),
        fields(subscription_id = %abbrev_uuid(&request.subscription_id), status = %request.status),
        err
    )]
    pub async fn record(
        &mut self,
        request: &NotificationRecordCreateDBRequest,
    ) -> Result<Option<NotificationRecord>> {
        let result = sqlx::query_as::<_, NotificationRecord>(
            r#"
            INSERT INTO notification_history
                (user_id, subscription_id, notification_date, days_before_billing,
                 status, slack_webhook_url, error_message, retry_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.subscription_id)
        .bind(request.notification_date)
        .bind(request.days_before_billing)
        .bind(request.status.as_str())
        .bind(&request.slack_webhook_url)
        .bind(&request.error_message)
        .bind(request.retry_count)
        .fetch_one(&mut *self.db)
        .await;

        match result {
            Ok(record) => Ok(Some(record)),
            Err(e) => match DbError::from(e) {
                DbError::UniqueViolation { .. } => Ok(None),
                other => Err(other),
            },
        }
    }

    /// A user's notification history, newest first.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_by_user(&mut self, user_id: UserId, limit: i64) -> Result<Vec<NotificationRecord>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            "SELECT * FROM notification_history
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::subscriptions::Subscriptions;
    use crate::db::models::subscriptions::SubscriptionCreateDBRequest;
    use crate::types::{BillingCycle, NotificationStatus};
    use rust_decimal_macros::dec;
    use sqlx::PgPool;
    use uuid::Uuid;

    async fn seed_subscription(conn: &mut PgConnection, user_id: UserId) -> SubscriptionId {
        use crate::db::handlers::repository::Repository;

        let mut repo = Subscriptions::new(conn);
        let created = repo
            .create(&SubscriptionCreateDBRequest {
                user_id,
                service_name: "Netflix".to_string(),
                amount: dec!(17000),
                currency: "KRW".to_string(),
                cycle: BillingCycle::Monthly,
                next_billing_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
                category: None,
                tags: None,
                billing_email: None,
                service_url: None,
                notes: None,
            })
            .await
            .unwrap();
        created.id
    }

    fn sent_request(
        user_id: UserId,
        subscription_id: SubscriptionId,
        date: NaiveDate,
        offset: i32,
    ) -> NotificationRecordCreateDBRequest {
        NotificationRecordCreateDBRequest {
            user_id,
            subscription_id,
            notification_date: date,
            days_before_billing: offset,
            status: NotificationStatus::Sent,
            slack_webhook_url: Some("https://hooks.slack.com/services/T0/B0/x".to_string()),
            error_message: None,
            retry_count: 0,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn duplicate_record_is_swallowed(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = Uuid::new_v4();
        let subscription_id = seed_subscription(&mut conn, user_id).await;
        let date = NaiveDate::from_ymd_opt(2026, 9, 12).unwrap();

        let mut repo = NotificationHistory::new(&mut conn);
        let request = sent_request(user_id, subscription_id, date, 3);

        let first = repo.record(&request).await.unwrap();
        assert!(first.is_some());

        let second = repo.record(&request).await.unwrap();
        assert!(second.is_none());

        // Same subscription, different offset, still records
        let other_offset = repo.record(&sent_request(user_id, subscription_id, date, 1)).await.unwrap();
        assert!(other_offset.is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn was_sent_ignores_failed_attempts(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = Uuid::new_v4();
        let subscription_id = seed_subscription(&mut conn, user_id).await;
        let date = NaiveDate::from_ymd_opt(2026, 9, 12).unwrap();

        let mut repo = NotificationHistory::new(&mut conn);
        assert!(!repo.was_sent(subscription_id, date, 3).await.unwrap());

        let mut failed = sent_request(user_id, subscription_id, date, 3);
        failed.status = NotificationStatus::Failed;
        failed.error_message = Some("slack webhook returned 500".to_string());
        failed.retry_count = 3;
        repo.record(&failed).await.unwrap();

        assert!(!repo.was_sent(subscription_id, date, 3).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn list_by_user_is_newest_first(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = Uuid::new_v4();
        let subscription_id = seed_subscription(&mut conn, user_id).await;
        let date = NaiveDate::from_ymd_opt(2026, 9, 12).unwrap();

        let mut repo = NotificationHistory::new(&mut conn);
        repo.record(&sent_request(user_id, subscription_id, date, 7)).await.unwrap();
        repo.record(&sent_request(user_id, subscription_id, date, 3)).await.unwrap();
        repo.record(&sent_request(user_id, subscription_id, date, 1)).await.unwrap();

        let records = repo.list_by_user(user_id, 2).await.unwrap();
        assert_eq!(records.len(), 2);

        let all = repo.list_by_user(user_id, 50).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }
}
