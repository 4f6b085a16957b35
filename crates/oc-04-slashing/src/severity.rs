//! The severity -> penalty decision table.

use rust_decimal::Decimal;
use shared_types::OutlierSeverity;

/// Blocks of history consulted for repeat-offender escalation.
pub const OUTLIER_REPUTATION_WINDOW: u64 = 1000;

/// Blocks an outlier-history entry survives before cleanup removes it.
pub const MAX_OUTLIER_HISTORY_BLOCKS: u64 = 10_000;

/// Prior outliers in the window that make a validator a repeat offender.
pub const REPEAT_OFFENDER_THRESHOLD: u64 = 3;

/// Prior outliers at which the Low-severity repeat fraction doubles.
pub const LOW_DOUBLE_THRESHOLD: u64 = 6;

/// Absolute ceiling on any single slash fraction: 0.1%.
pub fn slash_cap() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn low_repeat_fraction() -> Decimal {
    Decimal::new(5, 5) // 0.00005
}

fn moderate_repeat_base() -> Decimal {
    Decimal::new(1, 4) // 0.0001
}

fn high_fraction() -> Decimal {
    Decimal::new(2, 4) // 0.0002
}

fn extreme_fraction() -> Decimal {
    Decimal::new(5, 4) // 0.0005
}

/// Outcome of grading one outlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashDecision {
    /// Fraction of stake to slash; `None` means record-only.
    pub fraction: Option<Decimal>,
    pub jail: bool,
}

impl SlashDecision {
    fn none() -> Self {
        Self {
            fraction: None,
            jail: false,
        }
    }
}

/// Decide (slash?, fraction, jail?) for an outlier given the validator's
/// prior count inside the reputation window.
///
/// `base_fraction` is the governed floor; every computed fraction is
/// clamped into `[base_fraction, cap]`.
pub fn decide(
    severity: OutlierSeverity,
    prior_in_window: u64,
    base_fraction: Decimal,
) -> SlashDecision {
    // Grace: first recorded incident, below High severity.
    if severity < OutlierSeverity::High && prior_in_window == 0 {
        return SlashDecision::none();
    }

    let repeat = prior_in_window >= REPEAT_OFFENDER_THRESHOLD;
    let two = Decimal::TWO;

    let (raw, jail) = match severity {
        OutlierSeverity::Low => {
            if !repeat {
                return SlashDecision::none();
            }
            let mut fraction = low_repeat_fraction();
            if prior_in_window >= LOW_DOUBLE_THRESHOLD {
                fraction *= two;
            }
            (fraction, false)
        }
        OutlierSeverity::Moderate => {
            if !repeat {
                return SlashDecision::none();
            }
            (moderate_repeat_base() * two, true)
        }
        OutlierSeverity::High => {
            if repeat {
                (high_fraction() * two, true)
            } else {
                (high_fraction(), false)
            }
        }
        OutlierSeverity::Extreme => {
            let fraction = if repeat {
                extreme_fraction() * two
            } else {
                extreme_fraction()
            };
            (fraction, true)
        }
    };

    let clamped = raw.max(base_fraction).min(slash_cap());
    SlashDecision {
        fraction: Some(clamped),
        jail,
    }
}
