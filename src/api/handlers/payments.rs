//! Payment ledger handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    api::models::payments::{PaymentCreate, PaymentResponse},
    db::handlers::payments::Payments,
    db::handlers::repository::Repository,
    db::handlers::subscriptions::Subscriptions,
    errors::{Error, Result},
    types::{PaymentId, SubscriptionId, UserId},
};

#[utoipa::path(
    get,
    path = "/subscriptions/{id}/payments",
    tag = "payments",
    summary = "List payments",
    params(
        ("id" = uuid::Uuid, Path, description = "Subscription ID"),
    ),
    responses(
        (status = 200, description = "Payments, most recent first", body = [PaymentResponse]),
        (status = 404, description = "Subscription not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn list_payments(State(state): State<AppState>, Path(id): Path<SubscriptionId>) -> Result<Json<Vec<PaymentResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // 404 for unknown subscriptions rather than an empty list
    Subscriptions::new(&mut conn).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Subscription".to_string(),
        id: id.to_string(),
    })?;

    let payments = Payments::new(&mut conn).list_by_subscription(id).await?;
    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/subscriptions/{id}/payments",
    tag = "payments",
    summary = "Record payment",
    params(
        ("id" = uuid::Uuid, Path, description = "Subscription ID"),
    ),
    responses(
        (status = 201, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Invalid payment data"),
        (status = 404, description = "Subscription not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Path(id): Path<SubscriptionId>,
    Json(data): Json<PaymentCreate>,
) -> Result<(StatusCode, Json<PaymentResponse>)> {
    if data.amount <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "amount must be positive".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let subscription = Subscriptions::new(&mut conn).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Subscription".to_string(),
        id: id.to_string(),
    })?;

    let payment = Payments::new(&mut conn)
        .create(&data.into_db_request(subscription.user_id, id))
        .await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/payments/{payment_id}",
    tag = "payments",
    summary = "Delete payment",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Owner of the payment"),
        ("payment_id" = uuid::Uuid, Path, description = "Payment ID"),
    ),
    responses(
        (status = 204, description = "Payment deleted"),
        (status = 404, description = "Payment not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn delete_payment(
    State(state): State<AppState>,
    Path((user_id, payment_id)): Path<(UserId, PaymentId)>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let deleted = Payments::new(&mut conn).delete(payment_id, user_id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Payment".to_string(),
            id: payment_id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
