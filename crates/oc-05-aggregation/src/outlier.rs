//! # Multi-Stage Outlier Filter
//!
//! Applied to one asset's submission vector before the weighted median.
//!
//! - **Stage A** - absolute sanity bounds; failures are Extreme.
//! - **Stage B** - modified Z-score via MAD; skipped when MAD is zero.
//! - **Stage C** - consistency against the validator's own trailing
//!   submissions; escalates severity one level, and turns an otherwise
//!   accepted price into a Low outlier.
//! - **Stage D** - collusion detection over identical price strings;
//!   advisory only, never rejects.
//!
//! Both output lists preserve the canonical input order.

use crate::stats;
use oc_03_security::sanity;
use rust_decimal::Decimal;
use shared_types::{
    FilteredOutlier, OutlierReason, OutlierSeverity, ValidatorPrice,
};
use std::collections::BTreeMap;

/// MAD-to-sigma scale for the modified Z-score: 1.4826.
fn mad_scale() -> Decimal {
    Decimal::new(14826, 4)
}

/// Relative deviation from a validator's own history that escalates.
fn history_deviation_bound() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

/// Trailing submissions consulted per validator.
pub const HISTORY_DEPTH: usize = 5;

/// Minimum history length before stage C applies.
pub const HISTORY_MIN_SAMPLES: usize = 3;

/// Submitter share above which identical prices look coordinated.
fn collusion_share_bound() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

/// Submitters required before collusion detection applies.
pub const COLLUSION_MIN_SUBMITTERS: usize = 4;

fn z_severity(deviation: Decimal) -> Option<OutlierSeverity> {
    if deviation >= Decimal::from(5) {
        Some(OutlierSeverity::Extreme)
    } else if deviation >= Decimal::new(35, 1) {
        Some(OutlierSeverity::High)
    } else if deviation >= Decimal::new(25, 1) {
        Some(OutlierSeverity::Moderate)
    } else if deviation >= Decimal::new(15, 1) {
        Some(OutlierSeverity::Low)
    } else {
        None
    }
}

/// Result of the filter: retained submissions, graded rejects, and the
/// advisory collusion flag (price, submitter share).
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub valid: Vec<ValidatorPrice>,
    pub outliers: Vec<FilteredOutlier>,
    pub collusion: Option<(Decimal, Decimal)>,
}

/// Run stages A-D over the canonical submission vector.
///
/// `trailing` carries each validator's prior prices for this asset
/// (oldest first), as loaded from the submission history.
pub fn filter_outliers(
    submissions: &[ValidatorPrice],
    trailing: &BTreeMap<String, Vec<Decimal>>,
) -> FilterOutcome {
    // Stage A: sanity bounds.
    let mut flagged: Vec<(usize, OutlierSeverity, Decimal, OutlierReason)> = Vec::new();
    let mut survivors: Vec<usize> = Vec::new();
    for (index, submission) in submissions.iter().enumerate() {
        if sanity::price_in_bounds(submission.price) {
            survivors.push(index);
        } else {
            flagged.push((
                index,
                OutlierSeverity::Extreme,
                Decimal::ZERO,
                OutlierReason::SanityBounds,
            ));
        }
    }

    // Stage B: modified Z-score over the sane subset.
    let sane_prices: Vec<Decimal> = survivors
        .iter()
        .map(|&i| submissions[i].price)
        .collect();
    if let Some(center) = stats::median(&sane_prices) {
        let mad = stats::median_absolute_deviation(&sane_prices, center);
        if !mad.is_zero() {
            let scale = mad_scale() * mad;
            survivors.retain(|&index| {
                let deviation = (submissions[index].price - center).abs() / scale;
                match z_severity(deviation) {
                    Some(severity) => {
                        flagged.push((index, severity, deviation, OutlierReason::RobustZScore));
                        false
                    }
                    None => true,
                }
            });
        }
    }

    // Stage C: per-validator historical consistency.
    let historically_inconsistent = |submission: &ValidatorPrice| -> Option<Decimal> {
        let history = trailing.get(&submission.validator)?;
        if history.len() < HISTORY_MIN_SAMPLES {
            return None;
        }
        let recent = &history[history.len().saturating_sub(HISTORY_DEPTH)..];
        let avg = stats::mean(recent)?;
        if avg.is_zero() {
            return None;
        }
        let deviation = (submission.price - avg).abs() / avg;
        (deviation > history_deviation_bound()).then_some(deviation)
    };

    for entry in flagged.iter_mut() {
        if historically_inconsistent(&submissions[entry.0]).is_some() {
            entry.1 = entry.1.escalate();
        }
    }
    survivors.retain(|&index| {
        match historically_inconsistent(&submissions[index]) {
            Some(deviation) => {
                flagged.push((
                    index,
                    OutlierSeverity::Low,
                    deviation,
                    OutlierReason::HistoricalInconsistency,
                ));
                false
            }
            None => true,
        }
    });

    // Stage D: collusion flag over the full submission vector, advisory.
    let mut collusion = None;
    if submissions.len() > COLLUSION_MIN_SUBMITTERS - 1 {
        let mut groups: BTreeMap<String, u32> = BTreeMap::new();
        for submission in submissions {
            *groups.entry(submission.price.to_string()).or_insert(0) += 1;
        }
        let total = Decimal::from(submissions.len());
        for (price_string, count) in groups {
            let share = Decimal::from(count) / total;
            if share > collusion_share_bound() {
                // The parse cannot fail: the string came from a Decimal.
                if let Ok(price) = price_string.parse::<Decimal>() {
                    collusion = Some((price, share));
                }
            }
        }
    }

    flagged.sort_by_key(|entry| entry.0);
    let outliers = flagged
        .into_iter()
        .map(|(index, severity, deviation, reason)| {
            let submission = &submissions[index];
            FilteredOutlier {
                validator: submission.validator.clone(),
                asset: submission.asset.clone(),
                price: submission.price,
                block_height: submission.block_height,
                severity,
                deviation,
                reason,
            }
        })
        .collect();
    let valid = survivors
        .into_iter()
        .map(|index| submissions[index].clone())
        .collect();

    FilterOutcome {
        valid,
        outliers,
        collusion,
    }
}
