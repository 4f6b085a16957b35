//! # Geographic Diversity
//!
//! Herfindahl-Hirschman concentration monitoring over validator regions,
//! plus the runtime registration gate.
//!
//! `HHI = sum((count_r / total)^2)`, diversity score `1 - HHI`. A score of
//! zero means every validator sits in one region.

use rust_decimal::Decimal;
use shared_types::{EventBag, OracleEvent, OracleParams, OracleResult, OracleError};
use std::collections::BTreeMap;
use tracing::warn;

/// Region share above which a concentration warning fires.
pub fn concentration_warning_share() -> Decimal {
    Decimal::new(50, 2) // 0.50
}

/// Region share ceiling enforced at registration time.
pub fn registration_share_cap() -> Decimal {
    Decimal::new(40, 2) // 0.40
}

/// Validators required before share-based rules apply.
pub const MIN_VALIDATORS_FOR_SHARE_RULES: usize = 5;

/// Count active validators per region.
pub fn region_counts<'a, I>(regions: I) -> BTreeMap<String, u32>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = BTreeMap::new();
    for region in regions {
        *counts.entry(region.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Diversity score `1 - HHI` over the region distribution.
pub fn diversity_score(counts: &BTreeMap<String, u32>) -> Decimal {
    let total: u32 = counts.values().sum();
    if total == 0 {
        return Decimal::ZERO;
    }
    let total = Decimal::from(total);
    let hhi: Decimal = counts
        .values()
        .map(|&count| {
            let share = Decimal::from(count) / total;
            share * share
        })
        .sum();
    Decimal::ONE - hhi
}

/// Periodic diversity monitor: emits a status event each run, plus
/// warning/critical/concentration events as thresholds are crossed.
pub fn run_diversity_monitor(
    counts: &BTreeMap<String, u32>,
    params: &OracleParams,
    events: &mut EventBag,
) {
    let total: u32 = counts.values().sum();
    let score = diversity_score(counts);
    let unique_regions = counts.len() as u32;

    events.emit(OracleEvent::GeographicDiversityStatus {
        score,
        regions: unique_regions,
    });

    if score < params.diversity_warning_threshold {
        warn!(%score, regions = unique_regions, "geographic diversity below threshold");
        events.emit(OracleEvent::GeographicDiversityWarning {
            score,
            threshold: params.diversity_warning_threshold,
        });
    }
    if unique_regions < params.min_geographic_regions {
        events.emit(OracleEvent::GeographicDiversityCritical {
            regions: unique_regions,
            minimum: params.min_geographic_regions,
        });
    }

    if total as usize >= MIN_VALIDATORS_FOR_SHARE_RULES {
        let total_dec = Decimal::from(total);
        for (region, &count) in counts {
            let share = Decimal::from(count) / total_dec;
            if share > concentration_warning_share() {
                events.emit(OracleEvent::GeographicConcentrationWarning {
                    region: region.clone(),
                    share,
                });
            }
        }
    }
}

/// Runtime registration gate: refuse a new validator whose region would
/// push the simulated diversity score below the warning threshold, or any
/// region share above the registration cap once share rules apply.
///
/// Only enforced when `enforce_runtime_diversity` is set; the emitted
/// concentration warning accompanies every refusal.
pub fn check_registration(
    existing_counts: &BTreeMap<String, u32>,
    region: &str,
    params: &OracleParams,
    events: &mut EventBag,
) -> OracleResult<()> {
    if !params.enforce_runtime_diversity {
        return Ok(());
    }

    let mut simulated = existing_counts.clone();
    *simulated.entry(region.to_string()).or_insert(0) += 1;
    let total: u32 = simulated.values().sum();

    let score = diversity_score(&simulated);
    if score < params.diversity_warning_threshold {
        events.emit(OracleEvent::GeographicConcentrationWarning {
            region: region.to_string(),
            share: Decimal::from(simulated[region]) / Decimal::from(total),
        });
        return Err(OracleError::DiversityRefusal {
            region: region.to_string(),
        });
    }

    if total as usize >= MIN_VALIDATORS_FOR_SHARE_RULES {
        // Only the registering region can be pushed over the cap by this
        // registration; pre-existing concentration is the monitor's job.
        let share = Decimal::from(simulated[region]) / Decimal::from(total);
        if share > registration_share_cap() {
            events.emit(OracleEvent::GeographicConcentrationWarning {
                region: region.to_string(),
                share,
            });
            return Err(OracleError::DiversityRefusal {
                region: region.to_string(),
            });
        }
    }

    Ok(())
}
