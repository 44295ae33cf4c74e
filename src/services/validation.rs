//! Input checks shared by every mutating entry point

use crate::utils::{TrackerError, TrackerResult};

pub const MAX_SYMBOL_LEN: usize = 10;

/// Validate a coin symbol and return it uppercased
///
/// Accepts 1 to 10 ASCII letters in any case; anything else is `InvalidSymbol`.
pub fn normalize_symbol(symbol: &str) -> TrackerResult<String> {
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol.chars().all(|c| c.is_ascii_alphabetic());

    if !valid {
        return Err(TrackerError::InvalidSymbol(symbol.to_string()));
    }

    Ok(symbol.to_ascii_uppercase())
}

/// Prices must be finite and strictly positive
pub fn validate_price(price: f64) -> TrackerResult<()> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(TrackerError::InvalidPrice(price))
    }
}

/// Timestamps are unix seconds and must be strictly positive
pub fn validate_timestamp(timestamp: i64) -> TrackerResult<()> {
    if timestamp > 0 {
        Ok(())
    } else {
        Err(TrackerError::InvalidTimestamp(timestamp))
    }
}
