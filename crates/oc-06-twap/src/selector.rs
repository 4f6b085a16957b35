//! Robust estimator selection and cross-estimator consistency.

use crate::estimators::{
    exponential_twap, kalman_twap, standard_twap, trimmed_twap, volume_weighted_twap,
    TwapMethod, TwapResult,
};
use oc_01_state_store::KvRead;
use oc_02_registry::prices;
use rust_decimal::Decimal;
use shared_types::{approx_sqrt, OracleError, OracleResult, PriceSnapshot};
use tracing::debug;

/// Coefficient-of-variation bound under which the estimators agree.
fn consistency_bound() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn median_price(values: &mut Vec<Decimal>) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    values.sort();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / Decimal::TWO)
    }
}

/// Run all five estimators and collect the successes.
fn run_all(snapshots: &[PriceSnapshot], now: u64) -> Vec<TwapResult> {
    [
        standard_twap(snapshots, now),
        volume_weighted_twap(snapshots, now),
        exponential_twap(snapshots),
        trimmed_twap(snapshots, now),
        kalman_twap(snapshots),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// The robust selector: a single success passes through; multiple
/// successes return the median of their prices, tagged with the Kalman
/// confidence when available.
pub fn robust_twap(snapshots: &[PriceSnapshot], now: u64) -> OracleResult<TwapResult> {
    let results = run_all(snapshots, now);
    match results.len() {
        0 => {
            let asset = snapshots
                .first()
                .map(|s| s.asset.clone())
                .unwrap_or_default();
            Err(OracleError::InsufficientSnapshots {
                asset,
                have: snapshots.len(),
                need: 1,
            })
        }
        1 => Ok(results.into_iter().next().unwrap_or(TwapResult {
            method: TwapMethod::Robust,
            price: Decimal::ZERO,
            confidence: None,
        })),
        _ => {
            let confidence = results
                .iter()
                .find(|r| r.method == TwapMethod::Kalman)
                .and_then(|r| r.confidence);
            let mut prices: Vec<Decimal> = results.iter().map(|r| r.price).collect();
            let price = median_price(&mut prices).unwrap_or(results[0].price);
            Ok(TwapResult {
                method: TwapMethod::Robust,
                price,
                confidence,
            })
        }
    }
}

/// Whether the estimators agree: coefficient of variation across every
/// succeeding estimate below the bound. Fewer than two successes count as
/// consistent by default.
pub fn check_consistency(snapshots: &[PriceSnapshot], now: u64) -> bool {
    let estimates: Vec<Decimal> = run_all(snapshots, now).iter().map(|r| r.price).collect();
    if estimates.len() < 2 {
        return true;
    }

    let n = Decimal::from(estimates.len());
    let mean: Decimal = estimates.iter().copied().sum::<Decimal>() / n;
    if mean.is_zero() {
        return false;
    }
    let variance = estimates
        .iter()
        .map(|e| {
            let d = *e - mean;
            d * d
        })
        .sum::<Decimal>()
        / n;
    match approx_sqrt(variance) {
        Ok(std_dev) => {
            let cv = (std_dev / mean).abs();
            debug!(%cv, estimators = estimates.len(), "twap consistency");
            cv < consistency_bound()
        }
        Err(_) => false,
    }
}

/// Compute a TWAP for `asset` straight from the stored snapshot series.
pub fn compute_twap<S: KvRead>(
    store: &S,
    asset: &str,
    method: Option<TwapMethod>,
    now: u64,
) -> OracleResult<TwapResult> {
    let snapshots = prices::snapshots_for(store, asset)?;
    match method {
        None | Some(TwapMethod::Robust) => robust_twap(&snapshots, now),
        Some(TwapMethod::Standard) => standard_twap(&snapshots, now),
        Some(TwapMethod::VolumeWeighted) => volume_weighted_twap(&snapshots, now),
        Some(TwapMethod::Exponential) => exponential_twap(&snapshots),
        Some(TwapMethod::Trimmed) => trimmed_twap(&snapshots, now),
        Some(TwapMethod::Kalman) => kalman_twap(&snapshots),
    }
}
