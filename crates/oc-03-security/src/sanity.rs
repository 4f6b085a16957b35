//! Absolute price sanity bounds, shared by the submission gate and the
//! first stage of the outlier filter.

use rust_decimal::Decimal;
use shared_types::{OracleError, OracleResult};

/// Lowest admissible price: 10^-6.
pub fn min_price() -> Decimal {
    Decimal::new(1, 6)
}

/// Highest admissible price: 10^9.
pub fn max_price() -> Decimal {
    Decimal::from(1_000_000_000u64)
}

/// Longest admissible decimal string representation.
pub const MAX_PRICE_STRING_LEN: usize = 50;

/// Whether a price passes the absolute bounds.
pub fn price_in_bounds(price: Decimal) -> bool {
    price > min_price() && price <= max_price() && price.to_string().len() <= MAX_PRICE_STRING_LEN
}

/// Typed-error variant of [`price_in_bounds`] for the submission gate.
pub fn check_price_bounds(asset: &str, price: Decimal) -> OracleResult<()> {
    if asset.is_empty() {
        return Err(OracleError::EmptyAsset);
    }
    if !price_in_bounds(price) {
        return Err(OracleError::PriceOutOfBounds {
            asset: asset.to_string(),
            price: price.to_string(),
        });
    }
    Ok(())
}
