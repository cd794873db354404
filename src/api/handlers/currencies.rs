//! Supported currency listing.

use axum::response::Json;

use crate::currency::{CurrencyInfo, supported_currencies};

#[utoipa::path(
    get,
    path = "/currencies",
    tag = "currencies",
    summary = "List supported currencies",
    description = "Supported currency codes with their fixed KRW conversion rates",
    responses(
        (status = 200, description = "Supported currencies", body = [CurrencyInfo]),
    )
)]
pub async fn list_currencies() -> Json<Vec<CurrencyInfo>> {
    Json(supported_currencies())
}
