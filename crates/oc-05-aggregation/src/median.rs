//! Weighted median over (price, voting power) pairs.

use rust_decimal::Decimal;

/// The first price (ascending) whose cumulative weight reaches half of
/// the total weight. Ties resolve toward the lower price. Zero-weight
/// inputs are carried but cannot decide the outcome.
pub fn weighted_median(pairs: &[(Decimal, u64)]) -> Option<Decimal> {
    if pairs.is_empty() {
        return None;
    }
    let total: u128 = pairs.iter().map(|(_, w)| *w as u128).sum();
    if total == 0 {
        return None;
    }

    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut cumulative: u128 = 0;
    for (price, weight) in &sorted {
        cumulative += *weight as u128;
        // cumulative >= total/2, kept in integers.
        if cumulative * 2 >= total {
            return Some(*price);
        }
    }
    // Unreachable with total > 0; the last element always crosses half.
    sorted.last().map(|(price, _)| *price)
}
