//! Robust statistics over decimal price vectors.

use rust_decimal::Decimal;
use shared_types::approx_sqrt;
use tracing::error;

/// Median of a price vector. Even-length vectors average the middle pair.
pub fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / Decimal::TWO)
    }
}

pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().copied().sum();
    Some(sum / Decimal::from(values.len()))
}

/// Median absolute deviation around `center`.
pub fn median_absolute_deviation(values: &[Decimal], center: Decimal) -> Decimal {
    let deviations: Vec<Decimal> = values.iter().map(|v| (*v - center).abs()).collect();
    median(&deviations).unwrap_or(Decimal::ZERO)
}

/// Population standard deviation with the conservative fallback.
///
/// A failing square root means the variance went negative, which only
/// corruption can produce; liveness wins over accuracy there: the
/// incident is logged and `max(0.05 * mean, 0.01)` stands in as the scale
/// estimate.
pub fn std_dev_or_fallback(values: &[Decimal]) -> Decimal {
    let Some(mean_value) = mean(values) else {
        return Decimal::ZERO;
    };
    let variance = values
        .iter()
        .map(|v| {
            let d = *v - mean_value;
            d * d
        })
        .sum::<Decimal>()
        / Decimal::from(values.len());
    dispersion_from_variance(variance, mean_value)
}

/// Square-root step, separated so the corruption path is testable.
pub fn dispersion_from_variance(variance: Decimal, mean_value: Decimal) -> Decimal {
    match approx_sqrt(variance) {
        Ok(root) => root,
        Err(e) => {
            error!(error = %e, %variance, "variance sqrt failed, using conservative dispersion");
            conservative_dispersion(mean_value)
        }
    }
}

/// The documented fallback estimate: `max(0.05 * mean, 0.01)`.
pub fn conservative_dispersion(mean_value: Decimal) -> Decimal {
    let five_percent = mean_value * Decimal::new(5, 2);
    five_percent.max(Decimal::new(1, 2))
}
