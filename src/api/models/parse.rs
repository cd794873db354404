//! API models for payment-text parsing.

use serde::Deserialize;
use utoipa::ToSchema;

/// Request body for the parse endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ParseRequest {
    /// Free-text payment notification, e.g. a captured app push or email body
    pub text: String,
}
