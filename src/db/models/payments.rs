//! Database models for the payment ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::types::{PaymentId, PaymentStatus, SubscriptionId, UserId};

/// Database row for a recorded payment. Purely informational; no business rule
/// reads this table.
#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
    pub amount: Decimal,
    pub currency: String,
    pub payment_date: NaiveDate,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Typed status; unknown values read as `paid`.
    pub fn payment_status(&self) -> PaymentStatus {
        self.status.parse().unwrap_or(PaymentStatus::Paid)
    }
}

/// Request to record a payment against a subscription.
#[derive(Debug, Clone)]
pub struct PaymentCreateDBRequest {
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
    pub amount: Decimal,
    pub currency: String,
    pub payment_date: NaiveDate,
    pub status: PaymentStatus,
    pub notes: Option<String>,
}
