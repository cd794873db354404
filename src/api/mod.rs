//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Subscriptions** (`/api/v1/users/{user_id}/subscriptions`,
//!   `/api/v1/subscriptions/{id}`): CRUD, search, and export
//! - **Parsing** (`/api/v1/parse`): extract subscription fields from free text
//! - **Settings** (`/api/v1/users/{user_id}/settings`): Slack webhook and offsets
//! - **Notifications** (`/api/v1/users/{user_id}/notifications*`): history,
//!   on-demand checks, webhook test
//! - **Cron** (`/internal/cron/check-notifications`): scheduled sweep trigger
//! - **Currencies** (`/api/v1/currencies`): fixed KRW conversion table
//!
//! All endpoints are documented with `utoipa` annotations; the generated
//! document is served at `/api-docs/openapi.json` with a browsable UI at
//! `/docs`.

pub mod handlers;
pub mod models;
