//! Database repository for subscriptions.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::subscriptions::{Subscription, SubscriptionCreateDBRequest, SubscriptionUpdateDBRequest},
};
use crate::types::{BillingCycle, SubscriptionId, SubscriptionStatus, UserId, abbrev_uuid};

/// Sortable columns for subscription listings. A closed enum so user input can
/// never reach the ORDER BY clause as raw SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionSort {
    #[default]
    NextBillingDate,
    Amount,
    ServiceName,
}

impl SubscriptionSort {
    fn as_column(&self) -> &'static str {
        match self {
            Self::NextBillingDate => "next_billing_date",
            Self::Amount => "amount",
            Self::ServiceName => "service_name",
        }
    }
}

/// Filter for listing a user's subscriptions.
#[derive(Debug, Clone)]
pub struct SubscriptionFilter {
    pub user_id: UserId,
    /// Case-insensitive substring search on service_name and notes
    pub q: Option<String>,
    pub category: Option<String>,
    pub cycle: Option<BillingCycle>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub status: Option<SubscriptionStatus>,
    pub sort_by: SubscriptionSort,
    pub ascending: bool,
    pub skip: i64,
    pub limit: i64,
}

impl SubscriptionFilter {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            q: None,
            category: None,
            cycle: None,
            min_amount: None,
            max_amount: None,
            status: Some(SubscriptionStatus::Active),
            sort_by: SubscriptionSort::default(),
            ascending: true,
            skip: 0,
            limit: 500,
        }
    }
}

pub struct Subscriptions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Subscriptions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Soft-cancel a subscription. Returns the updated row, or None if the
    /// subscription does not exist.
    #[instrument(skip(self), fields(subscription_id = %abbrev_uuid(&id)), err)]
    pub async fn cancel(&mut self, id: SubscriptionId) -> Result<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "UPDATE subscriptions SET status = 'cancelled', updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    /// Active subscriptions for a user whose next billing date has not passed,
    /// ordered soonest first. This is the notification sweep's working set.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_upcoming(&mut self, user_id: UserId, today: NaiveDate) -> Result<Vec<Subscription>> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions
             WHERE user_id = $1 AND status = 'active' AND next_billing_date >= $2
             ORDER BY next_billing_date ASC",
        )
        .bind(user_id)
        .bind(today)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(subscriptions)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Subscriptions<'c> {
    type CreateRequest = SubscriptionCreateDBRequest;
    type UpdateRequest = SubscriptionUpdateDBRequest;
    type Response = Subscription;
    type Id = SubscriptionId;
    type Filter = SubscriptionFilter;

    #[instrument(skip(self, request), fields(service_name = %request.service_name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions
                (user_id, service_name, amount, currency, cycle, next_billing_date,
                 category, tags, billing_email, service_url, notes, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'active')
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(&request.service_name)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(request.cycle.as_str())
        .bind(request.next_billing_date)
        .bind(&request.category)
        .bind(&request.tags)
        .bind(&request.billing_email)
        .bind(&request.service_url)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    #[instrument(skip(self), fields(subscription_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let subscription = sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(subscription)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let subscriptions = sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(subscriptions.into_iter().map(|s| (s.id, s)).collect())
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        // Conditions and binds must stay in lockstep; each optional filter
        // appends its placeholder before its bind below.
        let mut query = String::from("SELECT * FROM subscriptions WHERE user_id = $1");
        let mut next_param = 2;

        if filter.status.is_some() {
            query.push_str(&format!(" AND status = ${}", next_param));
            next_param += 1;
        }
        if filter.q.is_some() {
            query.push_str(&format!(
                " AND (service_name ILIKE ${} OR notes ILIKE ${})",
                next_param, next_param
            ));
            next_param += 1;
        }
        if filter.category.is_some() {
            query.push_str(&format!(" AND category = ${}", next_param));
            next_param += 1;
        }
        if filter.cycle.is_some() {
            query.push_str(&format!(" AND cycle = ${}", next_param));
            next_param += 1;
        }
        if filter.min_amount.is_some() {
            query.push_str(&format!(" AND amount >= ${}", next_param));
            next_param += 1;
        }
        if filter.max_amount.is_some() {
            query.push_str(&format!(" AND amount <= ${}", next_param));
            next_param += 1;
        }

        let direction = if filter.ascending { "ASC" } else { "DESC" };
        query.push_str(&format!(
            " ORDER BY {} {} LIMIT ${} OFFSET ${}",
            filter.sort_by.as_column(),
            direction,
            next_param,
            next_param + 1
        ));

        let mut sql_query = sqlx::query_as::<_, Subscription>(&query).bind(filter.user_id);

        if let Some(status) = filter.status {
            sql_query = sql_query.bind(status.as_str());
        }
        if let Some(q) = &filter.q {
            sql_query = sql_query.bind(format!("%{}%", q));
        }
        if let Some(category) = &filter.category {
            sql_query = sql_query.bind(category);
        }
        if let Some(cycle) = filter.cycle {
            sql_query = sql_query.bind(cycle.as_str());
        }
        if let Some(min_amount) = filter.min_amount {
            sql_query = sql_query.bind(min_amount);
        }
        if let Some(max_amount) = filter.max_amount {
            sql_query = sql_query.bind(max_amount);
        }
        sql_query = sql_query.bind(filter.limit).bind(filter.skip);

        let subscriptions = sql_query.fetch_all(&mut *self.db).await?;
        Ok(subscriptions)
    }

    /// Soft delete. Rows are never removed; this flips status to cancelled.
    #[instrument(skip(self), fields(subscription_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        Ok(self.cancel(id).await?.is_some())
    }

    #[instrument(skip(self, request), fields(subscription_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions SET
                service_name = COALESCE($2, service_name),
                amount = COALESCE($3, amount),
                currency = COALESCE($4, currency),
                cycle = COALESCE($5, cycle),
                next_billing_date = COALESCE($6, next_billing_date),
                category = COALESCE($7, category),
                tags = COALESCE($8, tags),
                billing_email = COALESCE($9, billing_email),
                service_url = COALESCE($10, service_url),
                notes = COALESCE($11, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.service_name)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(request.cycle.map(|c| c.as_str()))
        .bind(request.next_billing_date)
        .bind(&request.category)
        .bind(&request.tags)
        .bind(&request.billing_email)
        .bind(&request.service_url)
        .bind(&request.notes)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;
    use uuid::Uuid;

    fn make_create(user_id: UserId, name: &str, amount: Decimal) -> SubscriptionCreateDBRequest {
        SubscriptionCreateDBRequest {
            user_id,
            service_name: name.to_string(),
            amount,
            currency: "KRW".to_string(),
            cycle: BillingCycle::Monthly,
            next_billing_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
            category: None,
            tags: None,
            billing_email: None,
            service_url: None,
            notes: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn create_then_get_returns_same_fields(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let user_id = Uuid::new_v4();
        let mut request = make_create(user_id, "Netflix", dec!(17000));
        request.category = Some("streaming".to_string());
        request.tags = Some(vec!["video".to_string(), "family".to_string()]);

        let created = repo.create(&request).await.unwrap();
        assert_eq!(created.service_name, "Netflix");
        assert_eq!(created.status, "active");

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, user_id);
        assert_eq!(fetched.amount, dec!(17000));
        assert_eq!(fetched.billing_cycle(), BillingCycle::Monthly);
        assert_eq!(fetched.category.as_deref(), Some("streaming"));
        assert_eq!(fetched.tags.as_deref(), Some(&["video".to_string(), "family".to_string()][..]));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn delete_is_soft_and_hides_from_active_list(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let user_id = Uuid::new_v4();
        let created = repo.create(&make_create(user_id, "Spotify", dec!(11900))).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());

        // Row still exists with cancelled status
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.subscription_status(), SubscriptionStatus::Cancelled);

        // Default (active-only) list no longer includes it
        let active = repo.list(&SubscriptionFilter::new(user_id)).await.unwrap();
        assert!(active.is_empty());

        // Deleting a missing id reports false
        assert!(!repo.delete(Uuid::new_v4()).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn list_applies_filters_and_sorting(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let user_id = Uuid::new_v4();
        let mut netflix = make_create(user_id, "Netflix", dec!(17000));
        netflix.category = Some("streaming".to_string());
        let mut icloud = make_create(user_id, "iCloud", dec!(3300));
        icloud.category = Some("cloud".to_string());
        let mut youtube = make_create(user_id, "YouTube Premium", dec!(14900));
        youtube.category = Some("streaming".to_string());

        repo.create(&netflix).await.unwrap();
        repo.create(&icloud).await.unwrap();
        repo.create(&youtube).await.unwrap();

        // Substring search
        let mut filter = SubscriptionFilter::new(user_id);
        filter.q = Some("net".to_string());
        let found = repo.list(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].service_name, "Netflix");

        // Category + amount range
        let mut filter = SubscriptionFilter::new(user_id);
        filter.category = Some("streaming".to_string());
        filter.min_amount = Some(dec!(15000));
        let found = repo.list(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].service_name, "Netflix");

        // Sort by amount descending
        let mut filter = SubscriptionFilter::new(user_id);
        filter.sort_by = SubscriptionSort::Amount;
        filter.ascending = false;
        let found = repo.list(&filter).await.unwrap();
        let names: Vec<_> = found.iter().map(|s| s.service_name.as_str()).collect();
        assert_eq!(names, vec!["Netflix", "YouTube Premium", "iCloud"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn update_changes_only_provided_fields(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let user_id = Uuid::new_v4();
        let created = repo.create(&make_create(user_id, "Notion", dec!(8))).await.unwrap();

        let update = SubscriptionUpdateDBRequest {
            amount: Some(dec!(10)),
            cycle: Some(BillingCycle::Yearly),
            ..Default::default()
        };
        let updated = repo.update(created.id, &update).await.unwrap();
        assert_eq!(updated.service_name, "Notion");
        assert_eq!(updated.amount, dec!(10));
        assert_eq!(updated.billing_cycle(), BillingCycle::Yearly);

        let missing = repo.update(Uuid::new_v4(), &update).await;
        assert!(matches!(missing, Err(DbError::NotFound)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn list_upcoming_skips_past_and_cancelled(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Subscriptions::new(&mut conn);

        let user_id = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();

        let mut past = make_create(user_id, "Expired", dec!(5000));
        past.next_billing_date = NaiveDate::from_ymd_opt(2026, 8, 20).unwrap();
        repo.create(&past).await.unwrap();

        let mut due = make_create(user_id, "Due", dec!(5000));
        due.next_billing_date = NaiveDate::from_ymd_opt(2026, 9, 4).unwrap();
        repo.create(&due).await.unwrap();

        let mut cancelled = make_create(user_id, "Cancelled", dec!(5000));
        cancelled.next_billing_date = NaiveDate::from_ymd_opt(2026, 9, 4).unwrap();
        let cancelled = repo.create(&cancelled).await.unwrap();
        repo.cancel(cancelled.id).await.unwrap();

        let upcoming = repo.list_upcoming(user_id, today).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].service_name, "Due");
    }
}
