//! Notification history, on-demand checks, webhook test, and the cron trigger.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use chrono::Utc;

use crate::{
    AppState,
    api::models::notifications::{CheckRequest, NotificationResponse, TestNotificationResponse},
    db::handlers::notification_history::NotificationHistory,
    db::handlers::settings::UserSettingsRepo,
    errors::{Error, Result},
    notifications::{CheckOutcome, CronSummary, check_all_users, check_user},
    types::UserId,
};

const HISTORY_LIMIT: i64 = 100;

#[utoipa::path(
    get,
    path = "/users/{user_id}/notifications",
    tag = "notifications",
    summary = "List notification history",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Notification history, newest first", body = [NotificationResponse]),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<NotificationResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let records = NotificationHistory::new(&mut conn).list_by_user(user_id, HISTORY_LIMIT).await?;
    Ok(Json(records.into_iter().map(NotificationResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/notifications/check",
    tag = "notifications",
    summary = "Run a reminder check",
    description = "Check the user's upcoming renewals and deliver due Slack reminders",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User ID"),
    ),
    request_body(content = CheckRequest, description = "Optional day-offset override"),
    responses(
        (status = 200, description = "Check outcome", body = CheckOutcome),
        (status = 412, description = "No Slack webhook configured"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn check_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    body: Option<Json<CheckRequest>>,
) -> Result<Json<CheckOutcome>> {
    let days_override = body.and_then(|Json(request)| request.days_before);
    let today = Utc::now().date_naive();

    let outcome = check_user(&state, user_id, today, days_override).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/notifications/test",
    tag = "notifications",
    summary = "Test the Slack webhook",
    description = "Send a canned message through the user's webhook, then run a real check",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Test result", body = TestNotificationResponse),
        (status = 412, description = "No Slack webhook configured"),
        (status = 502, description = "Slack delivery failed"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn test_notification(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<TestNotificationResponse>> {
    let webhook_url = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        UserSettingsRepo::new(&mut conn)
            .get_by_user(user_id)
            .await?
            .and_then(|s| s.slack_webhook_url)
            .ok_or_else(|| Error::PreconditionFailed {
                message: "Slack webhook URL is not configured".to_string(),
            })?
    };

    state
        .slack
        .send_text(&webhook_url, "✅ 구독 알림 테스트 메시지입니다. Slack 연동이 정상 동작합니다.")
        .await
        .map_err(|e| Error::Upstream {
            service: "Slack".to_string(),
            message: e.to_string(),
        })?;

    let check = check_user(&state, user_id, Utc::now().date_naive(), None).await?;
    Ok(Json(TestNotificationResponse {
        message: format!("테스트 메시지를 전송했습니다. 알림 {}건 발송, {}건 건너뜀.", check.sent, check.skipped),
        check,
    }))
}

#[utoipa::path(
    post,
    path = "/internal/cron/check-notifications",
    tag = "notifications",
    summary = "Cron sweep",
    description = "Run reminder checks for every user with notifications enabled and a webhook configured",
    responses(
        (status = 200, description = "Sweep summary", body = CronSummary),
        (status = 401, description = "Missing or invalid cron secret"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("cron_secret" = [])
    )
)]
pub async fn cron_check_notifications(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<CronSummary>> {
    // Only enforced when a secret is configured
    if let Some(secret) = &state.config.cron_secret {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == secret);

        if !authorized {
            return Err(Error::Unauthenticated {
                message: Some("Invalid cron secret".to_string()),
            });
        }
    }

    let summary = check_all_users(&state, Utc::now().date_naive()).await?;
    Ok(Json(summary))
}
