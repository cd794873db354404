//! Per-user notification settings repository.
//!
//! Settings are a singleton row per user, so this does not implement the
//! generic [`Repository`](crate::db::handlers::repository::Repository) trait;
//! the natural operations are get-by-user and upsert.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::Result,
    models::settings::{UserSettings, UserSettingsUpsertDBRequest},
};
use crate::types::{UserId, abbrev_uuid};

pub struct UserSettingsRepo<'c> {
    db: &'c mut PgConnection,
}

impl<'c> UserSettingsRepo<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_by_user(&mut self, user_id: UserId) -> Result<Option<UserSettings>> {
        let settings = sqlx::query_as::<_, UserSettings>("SELECT * FROM user_settings WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(settings)
    }

    /// Insert or update a user's settings. Fields left as None keep their
    /// stored (or default) value. Saving a webhook URL re-enables
    /// notifications unless the request says otherwise.
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn upsert(&mut self, user_id: UserId, request: &UserSettingsUpsertDBRequest) -> Result<UserSettings> {
        let enable = match request.notification_enabled {
            Some(explicit) => Some(explicit),
            None if request.slack_webhook_url.is_some() => Some(true),
            None => None,
        };

        let settings = sqlx::query_as::<_, UserSettings>(
            r#"
            INSERT INTO user_settings (user_id, slack_webhook_url, notification_enabled, notification_days_before)
            VALUES ($1, $2, COALESCE($3, TRUE), COALESCE($4, '{3}'))
            ON CONFLICT ON CONSTRAINT user_settings_user_unique DO UPDATE SET
                slack_webhook_url = COALESCE($2, user_settings.slack_webhook_url),
                notification_enabled = COALESCE($3, user_settings.notification_enabled),
                notification_days_before = COALESCE($4, user_settings.notification_days_before),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.slack_webhook_url)
        .bind(enable)
        .bind(&request.notification_days_before)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(settings)
    }

    /// Users eligible for the cron sweep: notifications enabled and a webhook
    /// configured.
    #[instrument(skip(self), err)]
    pub async fn list_notifiable(&mut self) -> Result<Vec<UserSettings>> {
        let settings = sqlx::query_as::<_, UserSettings>(
            "SELECT * FROM user_settings
             WHERE notification_enabled = TRUE AND slack_webhook_url IS NOT NULL
             ORDER BY created_at ASC",
        )
        .fetch_all(&mut *self.db)
        .await?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn upsert_creates_with_defaults(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UserSettingsRepo::new(&mut conn);

        let user_id = Uuid::new_v4();
        let settings = repo
            .upsert(user_id, &UserSettingsUpsertDBRequest::default())
            .await
            .unwrap();

        assert_eq!(settings.user_id, user_id);
        assert!(settings.notification_enabled);
        assert_eq!(settings.notification_days_before, vec![3]);
        assert!(settings.slack_webhook_url.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn saving_webhook_re_enables_notifications(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UserSettingsRepo::new(&mut conn);

        let user_id = Uuid::new_v4();
        repo.upsert(
            user_id,
            &UserSettingsUpsertDBRequest {
                notification_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let settings = repo
            .upsert(
                user_id,
                &UserSettingsUpsertDBRequest {
                    slack_webhook_url: Some("https://hooks.slack.com/services/T0/B0/x".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(settings.notification_enabled);
        assert_eq!(
            settings.slack_webhook_url.as_deref(),
            Some("https://hooks.slack.com/services/T0/B0/x")
        );
    }

    #[sqlx::test]
    #[test_log::test]
    async fn upsert_preserves_unset_fields(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UserSettingsRepo::new(&mut conn);

        let user_id = Uuid::new_v4();
        repo.upsert(
            user_id,
            &UserSettingsUpsertDBRequest {
                slack_webhook_url: Some("https://hooks.slack.com/services/T0/B0/x".to_string()),
                notification_days_before: Some(vec![7, 3, 1]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let settings = repo
            .upsert(
                user_id,
                &UserSettingsUpsertDBRequest {
                    notification_enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!settings.notification_enabled);
        assert_eq!(settings.notification_days_before, vec![7, 3, 1]);
        assert!(settings.slack_webhook_url.is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn list_notifiable_requires_webhook_and_enabled(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = UserSettingsRepo::new(&mut conn);

        let ready = Uuid::new_v4();
        repo.upsert(
            ready,
            &UserSettingsUpsertDBRequest {
                slack_webhook_url: Some("https://hooks.slack.com/services/T0/B0/ready".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let disabled = Uuid::new_v4();
        repo.upsert(
            disabled,
            &UserSettingsUpsertDBRequest {
                slack_webhook_url: Some("https://hooks.slack.com/services/T0/B0/off".to_string()),
                notification_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let no_webhook = Uuid::new_v4();
        repo.upsert(no_webhook, &UserSettingsUpsertDBRequest::default())
            .await
            .unwrap();

        let notifiable = repo.list_notifiable().await.unwrap();
        assert_eq!(notifiable.len(), 1);
        assert_eq!(notifiable[0].user_id, ready);
    }
}
