//! API models for the payment ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::payments::{Payment, PaymentCreateDBRequest};
use crate::types::{PaymentId, PaymentStatus, SubscriptionId, UserId};

/// Request body for recording a payment against a subscription.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentCreate {
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PaymentCreate {
    pub fn into_db_request(self, user_id: UserId, subscription_id: SubscriptionId) -> PaymentCreateDBRequest {
        PaymentCreateDBRequest {
            user_id,
            subscription_id,
            amount: self.amount,
            currency: self.currency.unwrap_or_else(|| "KRW".to_string()),
            payment_date: self.payment_date,
            status: self.status.unwrap_or(PaymentStatus::Paid),
            notes: self.notes,
        }
    }
}

/// Payment as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PaymentId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String, format = "uuid")]
    pub subscription_id: SubscriptionId,
    pub amount: Decimal,
    pub currency: String,
    pub payment_date: NaiveDate,
    pub status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(row: Payment) -> Self {
        let status = row.payment_status();
        Self {
            id: row.id,
            user_id: row.user_id,
            subscription_id: row.subscription_id,
            amount: row.amount,
            currency: row.currency,
            payment_date: row.payment_date,
            status,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}
