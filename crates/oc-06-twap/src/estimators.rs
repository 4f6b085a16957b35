//! The five TWAP estimators. Every estimator takes the asset's snapshot
//! series ascending by height plus the current block time, and fails with
//! a typed error rather than inventing a price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared_types::{OracleError, OracleResult, PriceSnapshot};

/// Largest admissible gap between two snapshot timestamps. Anything wider
/// indicates corrupted timestamps and would be unsafe to multiply.
pub const MAX_INTERVAL_SECS: u64 = 1_000_000_000_000_000_000;

/// Snapshots required by the trimmed estimator.
pub const TRIMMED_MIN_SNAPSHOTS: usize = 4;

/// EWMA smoothing factor: 0.3.
fn ewma_alpha() -> Decimal {
    Decimal::new(3, 1)
}

/// Flat volume assumed when no per-snapshot volume source exists.
fn default_volume() -> Decimal {
    Decimal::ONE
}

fn kalman_initial_error() -> Decimal {
    Decimal::ONE
}

fn kalman_process_noise() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn kalman_measurement_noise() -> Decimal {
    Decimal::new(1, 1) // 0.1
}

/// Which estimator produced a TWAP value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TwapMethod {
    Standard,
    VolumeWeighted,
    Exponential,
    Trimmed,
    Kalman,
    /// Median across all succeeding estimators.
    Robust,
}

/// One estimator's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwapResult {
    pub method: TwapMethod,
    pub price: Decimal,
    /// Kalman-derived confidence, where the estimator provides one.
    pub confidence: Option<Decimal>,
}

fn require_snapshots(asset_hint: &[PriceSnapshot], need: usize) -> OracleResult<()> {
    if asset_hint.len() < need {
        let asset = asset_hint
            .first()
            .map(|s| s.asset.clone())
            .unwrap_or_default();
        return Err(OracleError::InsufficientSnapshots {
            asset,
            have: asset_hint.len(),
            need,
        });
    }
    Ok(())
}

fn interval(earlier: u64, later: u64) -> OracleResult<Decimal> {
    let delta = later.saturating_sub(earlier);
    if delta > MAX_INTERVAL_SECS {
        return Err(OracleError::IntervalOverflow(format!(
            "snapshot interval {delta}s"
        )));
    }
    Ok(Decimal::from(delta))
}

/// Shared weighting scheme: snapshot `i` carries the time until the next
/// snapshot; the newest carries the time until `now`. `volume` scales
/// each weight.
fn time_weighted_mean(
    snapshots: &[PriceSnapshot],
    now: u64,
    volume: Decimal,
) -> OracleResult<Decimal> {
    let mut weighted_sum = Decimal::ZERO;
    let mut total_weight = Decimal::ZERO;

    for (index, snapshot) in snapshots.iter().enumerate() {
        let span = match snapshots.get(index + 1) {
            Some(next) => interval(snapshot.block_time, next.block_time)?,
            None => interval(snapshot.block_time, now)?,
        };
        let weight = span * volume;
        weighted_sum += snapshot.price * weight;
        total_weight += weight;
    }

    if total_weight.is_zero() {
        // All snapshots share one timestamp; the plain mean is the only
        // defensible answer.
        let sum: Decimal = snapshots.iter().map(|s| s.price).sum();
        return Ok(sum / Decimal::from(snapshots.len()));
    }
    Ok(weighted_sum / total_weight)
}

/// Standard time-weighted average price.
pub fn standard_twap(snapshots: &[PriceSnapshot], now: u64) -> OracleResult<TwapResult> {
    require_snapshots(snapshots, 1)?;
    Ok(TwapResult {
        method: TwapMethod::Standard,
        price: time_weighted_mean(snapshots, now, Decimal::ONE)?,
        confidence: None,
    })
}

/// Volume-weighted variant. Falls back to a flat volume estimate when no
/// true volume feed exists.
pub fn volume_weighted_twap(snapshots: &[PriceSnapshot], now: u64) -> OracleResult<TwapResult> {
    require_snapshots(snapshots, 1)?;
    Ok(TwapResult {
        method: TwapMethod::VolumeWeighted,
        price: time_weighted_mean(snapshots, now, default_volume())?,
        confidence: None,
    })
}

/// EWMA over snapshot prices in height order.
pub fn exponential_twap(snapshots: &[PriceSnapshot]) -> OracleResult<TwapResult> {
    require_snapshots(snapshots, 1)?;
    let alpha = ewma_alpha();
    let mut estimate = snapshots[0].price;
    for snapshot in &snapshots[1..] {
        estimate = alpha * snapshot.price + (Decimal::ONE - alpha) * estimate;
    }
    Ok(TwapResult {
        method: TwapMethod::Exponential,
        price: estimate,
        confidence: None,
    })
}

/// Drop the top and bottom 10% of prices (at least one each), then take
/// the time-weighted mean of what remains.
pub fn trimmed_twap(snapshots: &[PriceSnapshot], now: u64) -> OracleResult<TwapResult> {
    require_snapshots(snapshots, TRIMMED_MIN_SNAPSHOTS)?;

    let trim = (snapshots.len() / 10).max(1);
    let mut by_price: Vec<&PriceSnapshot> = snapshots.iter().collect();
    by_price.sort_by(|a, b| a.price.cmp(&b.price));
    let cut_low = by_price[trim - 1].price;
    let cut_high = by_price[by_price.len() - trim].price;

    let mut dropped_low = 0;
    let mut dropped_high = 0;
    let retained: Vec<PriceSnapshot> = snapshots
        .iter()
        .filter(|s| {
            if s.price <= cut_low && dropped_low < trim {
                dropped_low += 1;
                return false;
            }
            if s.price >= cut_high && dropped_high < trim {
                dropped_high += 1;
                return false;
            }
            true
        })
        .cloned()
        .collect();

    if retained.is_empty() {
        let asset = snapshots[0].asset.clone();
        return Err(OracleError::InsufficientSnapshots {
            asset,
            have: 0,
            need: 1,
        });
    }

    Ok(TwapResult {
        method: TwapMethod::Trimmed,
        price: time_weighted_mean(&retained, now, Decimal::ONE)?,
        confidence: None,
    })
}

/// Scalar Kalman filter over the snapshot prices.
pub fn kalman_twap(snapshots: &[PriceSnapshot]) -> OracleResult<TwapResult> {
    require_snapshots(snapshots, 1)?;

    let mut estimate = snapshots[0].price;
    let mut error = kalman_initial_error();

    for snapshot in &snapshots[1..] {
        // Predict: the estimate carries over, uncertainty grows.
        error += kalman_process_noise();
        // Correct.
        let gain = error / (error + kalman_measurement_noise());
        estimate += gain * (snapshot.price - estimate);
        error = (Decimal::ONE - gain) * error;
    }

    let confidence = Decimal::ONE / (Decimal::ONE + error);
    Ok(TwapResult {
        method: TwapMethod::Kalman,
        price: estimate,
        confidence: Some(confidence),
    })
}
