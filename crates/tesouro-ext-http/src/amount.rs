//! Brazilian monetary amounts.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use tesouro_traits::SourceError;

/// Parse a pt-BR formatted amount such as `R$ 1.234,56`.
///
/// `.` is the thousands separator, `,` the decimal separator and the `R$`
/// prefix is optional. Negative amounts are rejected.
pub fn parse_brl(input: &str) -> Result<Decimal, SourceError> {
    let value = input.trim();
    let value = value.strip_prefix("R$").unwrap_or(value).trim();
    let normalized = value.replace('.', "").replace(',', ".");

    let amount = Decimal::from_str(&normalized)
        .map_err(|_| SourceError::InvalidAmount(input.to_string()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(SourceError::InvalidAmount(input.to_string()));
    }
    Ok(amount)
}

/// Serde adapter for [`parse_brl`].
pub(crate) fn deserialize_brl<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_brl(&raw).map_err(serde::de::Error::custom)
}
