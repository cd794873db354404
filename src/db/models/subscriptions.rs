//! Database models for tracked subscriptions.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::types::{BillingCycle, SubscriptionId, SubscriptionStatus, UserId};

/// Database row for a subscription. `cycle` and `status` are stored as text;
/// the typed accessors below fall back to sensible defaults on unknown values.
#[derive(Debug, Clone, FromRow)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub service_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub cycle: String,
    pub next_billing_date: NaiveDate,
    pub status: String,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub billing_email: Option<String>,
    pub service_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Parsed billing cycle, defaulting to monthly for unrecognized values.
    pub fn billing_cycle(&self) -> BillingCycle {
        self.cycle.parse().unwrap_or(BillingCycle::Monthly)
    }

    /// Parsed status, defaulting to active for unrecognized values.
    pub fn subscription_status(&self) -> SubscriptionStatus {
        self.status.parse().unwrap_or(SubscriptionStatus::Active)
    }
}

/// Request to insert a new subscription. Status is always created as active.
#[derive(Debug, Clone)]
pub struct SubscriptionCreateDBRequest {
    pub user_id: UserId,
    pub service_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub cycle: BillingCycle,
    pub next_billing_date: NaiveDate,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub billing_email: Option<String>,
    pub service_url: Option<String>,
    pub notes: Option<String>,
}

/// Request to update a subscription. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdateDBRequest {
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
