//! API request and response data models.
//!
//! These structures define the public API contract and are kept distinct from
//! the database models so the two can evolve independently. All models carry
//! `utoipa` annotations for the generated OpenAPI document.

pub mod notifications;
pub mod parse;
pub mod payments;
pub mod settings;
pub mod subscriptions;
