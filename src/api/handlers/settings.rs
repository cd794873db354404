//! User settings handlers.

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::{
    AppState,
    api::models::settings::{UserSettingsResponse, UserSettingsUpdate},
    db::handlers::settings::UserSettingsRepo,
    errors::{Error, Result},
    types::UserId,
};

#[utoipa::path(
    get,
    path = "/users/{user_id}/settings",
    tag = "settings",
    summary = "Get notification settings",
    description = "Returns defaults (enabled, offsets [3], no webhook) when the user has no stored settings",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "The user's settings", body = UserSettingsResponse),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn get_settings(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Result<Json<UserSettingsResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let settings = UserSettingsRepo::new(&mut conn).get_by_user(user_id).await?;

    let response = match settings {
        Some(row) => row.into(),
        None => UserSettingsResponse::defaults(user_id, &state.config.notifications.default_days_before),
    };
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/users/{user_id}/settings",
    tag = "settings",
    summary = "Update notification settings",
    description = "Upsert; saving a webhook URL re-enables notifications unless notification_enabled is passed explicitly",
    params(
        ("user_id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Updated settings", body = UserSettingsResponse),
        (status = 400, description = "Invalid settings data"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn put_settings(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(data): Json<UserSettingsUpdate>,
) -> Result<Json<UserSettingsResponse>> {
    if let Some(days) = &data.notification_days_before {
        if days.is_empty() {
            return Err(Error::BadRequest {
                message: "notification_days_before cannot be empty".to_string(),
            });
        }
        if days.iter().any(|d| *d < 0) {
            return Err(Error::BadRequest {
                message: "notification_days_before entries must be non-negative".to_string(),
            });
        }
    }

    if let Some(url) = &data.slack_webhook_url
        && url::Url::parse(url).is_err()
    {
        return Err(Error::BadRequest {
            message: "slack_webhook_url must be a valid URL".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let settings = UserSettingsRepo::new(&mut conn).upsert(user_id, &data.into()).await?;
    Ok(Json(settings.into()))
}
