//! # subtrack: Subscription Tracking Service
//!
//! `subtrack` is a small web service for tracking recurring subscriptions. It stores
//! subscriptions in PostgreSQL, parses free-text payment messages into structured
//! subscription data via the Gemini API, and delivers renewal reminders to Slack via
//! incoming webhooks.
//!
//! ## Overview
//!
//! People accumulate subscriptions faster than they cancel them. This crate provides the
//! backend for a tracker: a REST API for managing subscriptions and per-user notification
//! settings, plus a scheduled sweep that checks which subscriptions are approaching their
//! next billing date and posts a reminder to the user's Slack webhook.
//!
//! ### What It Does
//!
//! Clients create subscriptions either directly or by submitting a pasted payment
//! confirmation message, which is parsed into structured fields by an LLM. A cron-driven
//! endpoint sweeps all users with notifications enabled: for each active subscription
//! whose next billing date is exactly one of the user's configured reminder offsets away,
//! a Slack Block Kit message is posted. Delivery is retried with linear backoff, and every
//! attempt outcome is recorded in a history table whose unique constraint guarantees each
//! reminder is sent at most once per subscription, date, and offset.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer
//! and uses PostgreSQL for all persistence. The **API layer** ([`api`]) exposes the
//! management surface under `/api/v1/*` and the cron trigger under
//! `/internal/cron/check-notifications`. The **database layer** ([`db`]) uses the
//! repository pattern; each entity has a repository handling queries and mutations. The
//! **notification core** ([`notifications`]) implements the sweep semantics and is shared
//! by the per-user check endpoint and the cron endpoint. Outbound integrations live in
//! [`slack`] and [`gemini`], both thin reqwest clients with test-overridable base URLs.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use subtrack::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = subtrack::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     subtrack::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! The application requires a PostgreSQL database and runs migrations on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! subtrack::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod config;
pub mod currency;
pub mod db;
pub mod errors;
pub mod gemini;
pub mod notifications;
mod openapi;
pub mod slack;
pub mod telemetry;
pub mod types;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::gemini::GeminiClient;
use crate::openapi::ApiDoc;
use crate::slack::SlackClient;

pub use types::{NotificationId, PaymentId, SubscriptionId, UserId};

/// Application state shared across all request handlers.
///
/// Holds the database pool, configuration, and the outbound Slack and Gemini
/// clients. Cloned per request; everything inside is cheaply cloneable.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub slack: SlackClient,
    pub gemini: GeminiClient,
}

/// Get the subtrack database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build the application router with all endpoints and middleware.
///
/// The management API is nested under `/api/v1`. The cron trigger and health
/// probe live at the root, alongside the interactive API docs at `/docs`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Subscription management
        .route("/users/{user_id}/subscriptions", get(api::handlers::subscriptions::list_subscriptions))
        .route("/users/{user_id}/subscriptions", post(api::handlers::subscriptions::create_subscription))
        .route(
            "/users/{user_id}/subscriptions/export",
            get(api::handlers::subscriptions::export_subscriptions),
        )
        .route("/subscriptions/{id}", get(api::handlers::subscriptions::get_subscription))
        .route("/subscriptions/{id}", patch(api::handlers::subscriptions::update_subscription))
        .route("/subscriptions/{id}", delete(api::handlers::subscriptions::delete_subscription))
        // Payment ledger as subscription sub-resources
        .route("/subscriptions/{id}/payments", get(api::handlers::payments::list_payments))
        .route("/subscriptions/{id}/payments", post(api::handlers::payments::create_payment))
        .route(
            "/users/{user_id}/payments/{payment_id}",
            delete(api::handlers::payments::delete_payment),
        )
        // Notification settings
        .route("/users/{user_id}/settings", get(api::handlers::settings::get_settings))
        .route("/users/{user_id}/settings", put(api::handlers::settings::put_settings))
        // Reminder history and manual checks
        .route("/users/{user_id}/notifications", get(api::handlers::notifications::list_notifications))
        .route(
            "/users/{user_id}/notifications/check",
            post(api::handlers::notifications::check_notifications),
        )
        .route(
            "/users/{user_id}/notifications/test",
            post(api::handlers::notifications::test_notification),
        )
        // Payment-text parsing
        .route("/parse", post(api::handlers::parse::parse_payment_text))
        // Currency table
        .route("/currencies", get(api::handlers::currencies::list_currencies));

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        // Invoked by an external scheduler; GET kept for curl-friendliness
        .route(
            "/internal/cron/check-notifications",
            get(api::handlers::notifications::cron_check_notifications)
                .post(api::handlers::notifications::cron_check_notifications),
        )
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .route(
            "/api-docs/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to the database and runs migrations
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
/// 3. **Shutdown**: on the shutdown signal, drains connections and closes the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting subtrack with configuration: {:#?}", config);

        let pool = PgPoolOptions::new()
            .max_connections(config.database.pool.max_connections)
            .min_connections(config.database.pool.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.database.pool.acquire_timeout_secs))
            .connect(&config.database.url)
            .await?;
        migrator().run(&pool).await?;

        let state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .slack(SlackClient::new(&config.slack))
            .gemini(GeminiClient::new(&config.gemini))
            .build();

        let router = build_router(state);

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "subtrack listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    /// Build a test server over a sqlx test pool. The Slack and Gemini base
    /// URLs can be pointed at wiremock servers via the returned config.
    pub fn test_server_with_config(pool: PgPool, config: Config) -> axum_test::TestServer {
        let state = AppState::builder()
            .db(pool)
            .config(config.clone())
            .slack(SlackClient::new(&config.slack))
            .gemini(GeminiClient::new(&config.gemini))
            .build();
        axum_test::TestServer::new(build_router(state).into_make_service()).expect("Failed to create test server")
    }

    pub fn test_server(pool: PgPool) -> axum_test::TestServer {
        let mut config = Config::default();
        config.slack.retry_delay_ms = 10;
        test_server_with_config(pool, config)
    }
}
