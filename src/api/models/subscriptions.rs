//! API models for subscriptions.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::subscriptions::{Subscription, SubscriptionCreateDBRequest, SubscriptionUpdateDBRequest};
use crate::types::{BillingCycle, SubscriptionId, SubscriptionStatus, UserId};

/// Request body for creating a subscription. Status is always `active` on
/// creation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubscriptionCreate {
    pub service_name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    pub cycle: BillingCycle,
    pub next_billing_date: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub billing_email: Option<String>,
    #[serde(default)]
    pub service_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SubscriptionCreate {
    pub fn into_db_request(self, user_id: UserId) -> SubscriptionCreateDBRequest {
        SubscriptionCreateDBRequest {
            user_id,
            service_name: self.service_name,
            amount: self.amount,
            currency: self.currency.unwrap_or_else(|| "KRW".to_string()),
            cycle: self.cycle,
            next_billing_date: self.next_billing_date,
            category: self.category,
            tags: self.tags,
            billing_email: self.billing_email,
            service_url: self.service_url,
            notes: self.notes,
        }
    }
}

/// Partial update request; absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SubscriptionUpdate {
    pub service_name: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub cycle: Option<BillingCycle>,
    pub next_billing_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub billing_email: Option<String>,
    pub service_url: Option<String>,
    pub notes: Option<String>,
}

impl From<SubscriptionUpdate> for SubscriptionUpdateDBRequest {
    fn from(update: SubscriptionUpdate) -> Self {
        Self {
            service_name: update.service_name,
            amount: update.amount,
            currency: update.currency,
            cycle: update.cycle,
            next_billing_date: update.next_billing_date,
            category: update.category,
            tags: update.tags,
            billing_email: update.billing_email,
            service_url: update.service_url,
            notes: update.notes,
        }
    }
}

/// Subscription as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: SubscriptionId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub service_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub cycle: BillingCycle,
    pub next_billing_date: NaiveDate,
    pub status: SubscriptionStatus,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub billing_email: Option<String>,
    pub service_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(row: Subscription) -> Self {
        let cycle = row.billing_cycle();
        let status = row.subscription_status();
        Self {
            id: row.id,
            user_id: row.user_id,
            service_name: row.service_name,
            amount: row.amount,
            currency: row.currency,
            cycle,
            next_billing_date: row.next_billing_date,
            status,
            category: row.category,
            tags: row.tags,
            billing_email: row.billing_email,
            service_url: row.service_url,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Sort column selector for listings.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    NextBillingDate,
    Amount,
    ServiceName,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Query parameters for listing subscriptions.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListSubscriptionsQuery {
    /// Case-insensitive substring search on service name and notes
    pub q: Option<String>,
    pub category: Option<String>,
    pub cycle: Option<BillingCycle>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    /// Defaults to `active`; pass `cancelled` to list cancelled subscriptions
    pub status: Option<SubscriptionStatus>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub order: SortOrder,
}

/// Export output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

/// Query parameters for the export endpoint.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}
