//! Missed-vote accounting.
//!
//! At each vote-period boundary every bonded validator that did not submit
//! for a tracked asset gains a miss. At slash-window boundaries validators
//! over the tolerated miss budget take the base slash and reset.

use oc_01_state_store::KvStore;
use oc_02_registry::{registry, submissions};
use shared_types::{OracleParams, OracleResult, ValidatorSetProvider};
use tracing::{debug, warn};

/// Bump miss counters for bonded validators without a submission for
/// `asset` inside the closing vote period. Returns the miss count.
pub fn account_missed_votes<S, V>(
    store: &S,
    staking: &V,
    params: &OracleParams,
    asset: &str,
    height: u64,
) -> OracleResult<u64>
where
    S: KvStore,
    V: ValidatorSetProvider + ?Sized,
{
    let period_start = height.saturating_sub(params.vote_period);
    let mut misses = 0;

    for validator in staking.iterate_bonded() {
        let voted = submissions::get_latest(store, asset, &validator.id)?
            .map(|price| price.block_height > period_start)
            .unwrap_or(false);
        if !voted {
            let counter = registry::increment_miss_counter(store, &validator.id)?;
            debug!(validator = %validator.id, asset, counter, "missed vote");
            misses += 1;
        }
    }
    Ok(misses)
}

/// At a slash-window boundary, slash and reset every validator whose miss
/// counter exceeded the tolerated budget.
pub fn evaluate_slash_window<S, V>(
    store: &S,
    staking: &V,
    params: &OracleParams,
    height: u64,
) -> OracleResult<u64>
where
    S: KvStore,
    V: ValidatorSetProvider + ?Sized,
{
    let mut slashed = 0;

    for row in registry::iterate_validator_oracles(store)? {
        if row.miss_counter <= params.min_valid_per_window {
            continue;
        }
        if let Some(validator) = staking.get_validator(&row.validator) {
            let power = validator.power(staking.power_reduction());
            if let Err(e) = staking.slash(
                &validator.consensus_id,
                height,
                power,
                params.slash_fraction,
            ) {
                warn!(validator = %row.validator, error = %e, "staking rejected miss slash");
            } else {
                slashed += 1;
            }
        }
        registry::reset_miss_counter(store, &row.validator)?;
    }
    Ok(slashed)
}
