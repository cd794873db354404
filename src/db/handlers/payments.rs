//! Repository for the informational payment ledger.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::Result,
    models::payments::{Payment, PaymentCreateDBRequest},
};
use crate::types::{PaymentId, SubscriptionId, UserId, abbrev_uuid};

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(
        skip(self, request),
        fields(subscription_id = %abbrev_uuid(&request.subscription_id)),
        err
    )]
    pub async fn create(&mut self, request: &PaymentCreateDBRequest) -> Result<Payment> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payment_history (user_id, subscription_id, amount, currency, payment_date, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.subscription_id)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(request.payment_date)
        .bind(request.status.as_str())
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payment)
    }

    /// Payments recorded against a subscription, most recent payment first.
    #[instrument(skip(self), fields(subscription_id = %abbrev_uuid(&subscription_id)), err)]
    pub async fn list_by_subscription(&mut self, subscription_id: SubscriptionId) -> Result<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payment_history
             WHERE subscription_id = $1
             ORDER BY payment_date DESC, created_at DESC",
        )
        .bind(subscription_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(payments)
    }

    #[instrument(skip(self), fields(payment_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: PaymentId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payment_history WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::repository::Repository;
    use crate::db::handlers::subscriptions::Subscriptions;
    use crate::db::models::subscriptions::SubscriptionCreateDBRequest;
    use crate::types::{BillingCycle, PaymentStatus};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;
    use uuid::Uuid;

    async fn seed_subscription(conn: &mut PgConnection, user_id: UserId) -> SubscriptionId {
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

    #[sqlx::test]
    #[test_log::test]
    async fn create_and_list_orders_by_payment_date(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = Uuid::new_v4();
        let subscription_id = seed_subscription(&mut conn, user_id).await;

        let mut repo = Payments::new(&mut conn);
        for (month, day) in [(6, 15), (8, 15), (7, 15)] {
            repo.create(&PaymentCreateDBRequest {
                user_id,
                subscription_id,
                amount: dec!(17000),
                currency: "KRW".to_string(),
                payment_date: NaiveDate::from_ymd_opt(2026, month, day).unwrap(),
                status: PaymentStatus::Paid,
                notes: None,
            })
            .await
            .unwrap();
        }

        let payments = repo.list_by_subscription(subscription_id).await.unwrap();
        assert_eq!(payments.len(), 3);
        let months: Vec<_> = payments
            .iter()
            .map(|p| p.payment_date.format("%m").to_string())
            .collect();
        assert_eq!(months, vec!["08", "07", "06"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn delete_is_scoped_to_owner(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = Uuid::new_v4();
        let subscription_id = seed_subscription(&mut conn, user_id).await;

        let mut repo = Payments::new(&mut conn);
        let payment = repo
            .create(&PaymentCreateDBRequest {
                user_id,
                subscription_id,
                amount: dec!(17000),
                currency: "KRW".to_string(),
                payment_date: NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
                status: PaymentStatus::Paid,
                notes: Some("card ending 1234".to_string()),
            })
            .await
            .unwrap();

        // Wrong owner cannot delete
        assert!(!repo.delete(payment.id, Uuid::new_v4()).await.unwrap());
        assert!(repo.delete(payment.id, user_id).await.unwrap());
        assert!(repo.list_by_subscription(subscription_id).await.unwrap().is_empty());
    }
}
