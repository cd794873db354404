//! Subscription CRUD and export handlers.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    api::models::subscriptions::{
        ExportFormat, ExportQuery, ListSubscriptionsQuery, SortBy, SortOrder, SubscriptionCreate, SubscriptionResponse,
        SubscriptionUpdate,
    },
    db::handlers::repository::Repository,
    db::handlers::subscriptions::{SubscriptionFilter, SubscriptionSort, Subscriptions},
    db::models::subscriptions::Subscription,
    errors::{Error, Result},
    types::{SubscriptionId, SubscriptionStatus, UserId},
};

fn validate_create(data: &SubscriptionCreate) -> Result<()> {
    if data.service_name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "service_name cannot be empty".to_string(),
        });
    }
    if data.amount <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "amount must be positive".to_string(),
        });
    }
    Ok(())
}

fn filter_from_query(user_id: UserId, query: ListSubscriptionsQuery) -> SubscriptionFilter {
    let mut filter = SubscriptionFilter::new(user_id);
    filter.q = query.q;
    filter.category = query.category;
    filter.cycle = query.cycle;
    filter.min_amount = query.min_amount;
    filter.max_amount = query.max_amount;
    filter.status = Some(query.status.unwrap_or(SubscriptionStatus::Active));
    filter.sort_by = match query.sort_by {
        SortBy::NextBillingDate => SubscriptionSort::NextBillingDate,
        SortBy::Amount => SubscriptionSort::Amount,
        SortBy::ServiceName => SubscriptionSort::ServiceName,
    };
    filter.ascending = matches!(query.order, SortOrder::Asc);
    filter
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/subscriptions",
    tag = "subscriptions",
    summary = "List subscriptions",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Owner of the subscriptions"),
        ListSubscriptionsQuery
    ),
    responses(
        (status = 200, description = "Matching subscriptions", body = [SubscriptionResponse]),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<ListSubscriptionsQuery>,
) -> Result<Json<Vec<SubscriptionResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let filter = filter_from_query(user_id, query);

    let subscriptions = Subscriptions::new(&mut conn).list(&filter).await?;
    Ok(Json(subscriptions.into_iter().map(SubscriptionResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/subscriptions",
    tag = "subscriptions",
    summary = "Create subscription",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Owner of the subscription"),
    ),
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionResponse),
        (status = 400, description = "Invalid subscription data"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn create_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(data): Json<SubscriptionCreate>,
) -> Result<(StatusCode, Json<SubscriptionResponse>)> {
    validate_create(&data)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let created = Subscriptions::new(&mut conn).create(&data.into_db_request(user_id)).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    summary = "Get subscription",
    params(
        ("id" = uuid::Uuid, Path, description = "Subscription ID"),
    ),
    responses(
        (status = 200, description = "The subscription", body = SubscriptionResponse),
        (status = 404, description = "Subscription not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<SubscriptionId>,
) -> Result<Json<SubscriptionResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let subscription = Subscriptions::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Subscription".to_string(),
            id: id.to_string(),
        })?;
    Ok(Json(subscription.into()))
}

#[utoipa::path(
    patch,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    summary = "Update subscription",
    params(
        ("id" = uuid::Uuid, Path, description = "Subscription ID"),
    ),
    responses(
        (status = 200, description = "Updated subscription", body = SubscriptionResponse),
        (status = 404, description = "Subscription not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn update_subscription(
    State(state): State<AppState>,
    Path(id): Path<SubscriptionId>,
    Json(data): Json<SubscriptionUpdate>,
) -> Result<Json<SubscriptionResponse>> {
    if let Some(amount) = data.amount
        && amount <= Decimal::ZERO
    {
        return Err(Error::BadRequest {
            message: "amount must be positive".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let updated = Subscriptions::new(&mut conn).update(id, &data.into()).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    summary = "Cancel subscription",
    description = "Soft delete: the subscription is marked cancelled, never removed",
    params(
        ("id" = uuid::Uuid, Path, description = "Subscription ID"),
    ),
    responses(
        (status = 204, description = "Subscription cancelled"),
        (status = 404, description = "Subscription not found"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn delete_subscription(State(state): State<AppState>, Path(id): Path<SubscriptionId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let cancelled = Subscriptions::new(&mut conn).delete(id).await?;
    if !cancelled {
        return Err(Error::NotFound {
            resource: "Subscription".to_string(),
            id: id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/subscriptions/export",
    tag = "subscriptions",
    summary = "Export subscriptions",
    description = "Export the user's active subscriptions as CSV or JSON",
    params(
        ("user_id" = uuid::Uuid, Path, description = "Owner of the subscriptions"),
        ExportQuery
    ),
    responses(
        (status = 200, description = "Exported subscriptions"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn export_subscriptions(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let subscriptions = Subscriptions::new(&mut conn).list(&SubscriptionFilter::new(user_id)).await?;

    let response = match query.format {
        ExportFormat::Json => {
            let body: Vec<SubscriptionResponse> = subscriptions.into_iter().map(SubscriptionResponse::from).collect();
            (
                [(header::CONTENT_DISPOSITION, "attachment; filename=\"subscriptions.json\"")],
                Json(body),
            )
                .into_response()
        }
        ExportFormat::Csv => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"subscriptions.csv\""),
            ],
            to_csv(&subscriptions),
        )
            .into_response(),
    };

    Ok(response)
}

const CSV_HEADER: &str = "service_name,amount,currency,cycle,next_billing_date,status,category,tags,billing_email,service_url,notes";

fn to_csv(subscriptions: &[Subscription]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for s in subscriptions {
        let fields = [
            s.service_name.clone(),
            s.amount.to_string(),
            s.currency.clone(),
            s.cycle.clone(),
            s.next_billing_date.format("%Y-%m-%d").to_string(),
            s.status.clone(),
            s.category.clone().unwrap_or_default(),
            s.tags.as_deref().map(|t| t.join(";")).unwrap_or_default(),
            s.billing_email.clone().unwrap_or_default(),
            s.service_url.clone().unwrap_or_default(),
            s.notes.clone().unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Quote a CSV field when it contains a comma, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample(name: &str, notes: Option<&str>) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            service_name: name.to_string(),
            amount: dec!(17000),
            currency: "KRW".to_string(),
            cycle: "monthly".to_string(),
            next_billing_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
            status: "active".to_string(),
            category: Some("streaming".to_string()),
            tags: Some(vec!["video".to_string(), "family".to_string()]),
            billing_email: None,
            service_url: None,
            notes: notes.map(String::from),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn csv_escape_quotes_special_fields() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn csv_export_has_header_and_rows() {
        let rows = vec![sample("Netflix", None), sample("Spotify, Inc", Some("shared, family plan"))];
        let csv = to_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("Netflix,17000,KRW,monthly,2026-09-15,active,streaming,video;family"));
        assert!(lines[2].starts_with("\"Spotify, Inc\","));
        assert!(lines[2].ends_with("\"shared, family plan\""));
    }
}
