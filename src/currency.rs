//! Fixed currency-conversion table and display formatting.
//!
//! Rates are a static KRW-base snapshot; there is no live exchange-rate feed.
//! Unknown currency codes fall back to a rate of 1 so amounts still render.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use utoipa::ToSchema;

/// KRW per one unit of the given currency.
const EXCHANGE_RATES: &[(&str, f64)] = &[
    ("KRW", 1.0),
    ("USD", 1350.0),
    ("EUR", 1480.0),
    ("GBP", 1700.0),
    ("JPY", 9.2),
    ("CNY", 190.0),
    ("AUD", 900.0),
    ("CAD", 1000.0),
    ("HKD", 173.0),
    ("SGD", 1000.0),
    ("MYR", 290.0),
    ("THB", 38.0),
    ("PHP", 24.0),
    ("IDR", 0.086),
    ("VND", 0.055),
    ("INR", 16.0),
    ("CHF", 1550.0),
    ("NZD", 830.0),
    ("SEK", 130.0),
    ("NOK", 130.0),
    ("DKK", 200.0),
    ("PLN", 340.0),
    ("MXN", 80.0),
    ("BRL", 270.0),
    ("ZAR", 75.0),
    ("TRY", 45.0),
    ("RUB", 15.0),
];

/// A supported currency and its fixed conversion rate, as returned by the
/// `/api/v1/currencies` endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CurrencyInfo {
    /// ISO 4217 currency code
    pub code: String,
    /// KRW per one unit of this currency
    pub rate_to_krw: f64,
}

/// Look up the KRW rate for a currency code (case-insensitive).
/// Unknown codes return 1.
pub fn exchange_rate(currency: &str) -> f64 {
    let upper = currency.to_uppercase();
    EXCHANGE_RATES
        .iter()
        .find(|(code, _)| *code == upper)
        .map(|(_, rate)| *rate)
        .unwrap_or(1.0)
}

/// Whether the currency code is in the conversion table.
pub fn is_valid_currency(currency: &str) -> bool {
    let upper = currency.to_uppercase();
    EXCHANGE_RATES.iter().any(|(code, _)| *code == upper)
}

/// Convert an amount to KRW using the fixed table.
pub fn convert_to_krw(amount: Decimal, currency: &str) -> Decimal {
    if currency.eq_ignore_ascii_case("KRW") {
        return amount;
    }
    let rate = Decimal::from_f64(exchange_rate(currency)).unwrap_or(Decimal::ONE);
    amount * rate
}

/// All supported currencies with their rates, KRW first.
pub fn supported_currencies() -> Vec<CurrencyInfo> {
    EXCHANGE_RATES
        .iter()
        .map(|(code, rate)| CurrencyInfo {
            code: (*code).to_string(),
            rate_to_krw: *rate,
        })
        .collect()
}

/// Render an amount for human-facing messages. KRW renders as `N원`; other
/// currencies render as `amount CODE` with an approximate KRW figure appended.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let upper = currency.to_uppercase();
    if upper == "KRW" {
        format!("{}원", group_thousands(amount.round()))
    } else {
        let krw = convert_to_krw(amount, &upper).round();
        format!("{} {} (약 {}원)", amount, upper, group_thousands(krw))
    }
}

/// Comma-group the integer digits of a rounded amount (17000 -> "17,000").
fn group_thousands(amount: Decimal) -> String {
    let raw = amount.round().to_string();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}")
}
