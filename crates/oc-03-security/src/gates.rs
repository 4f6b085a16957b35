//! # Pre-Submission Gates
//!
//! Ordered policy checks every price submission passes before it is
//! recorded. A failed gate fails only the submission, never the block.
//!
//! Order: sanity bounds, validator existence, feeder authorization,
//! minimum stake, validator age, rate limits, update interval, flash-loan
//! guard.

use crate::breaker;
use crate::sanity;
use oc_01_state_store::KvStore;
use oc_02_registry::{delegations, prices, submissions};
use rust_decimal::Decimal;
use shared_types::{
    BondedValidator, EventBag, OracleError, OracleParams, OracleResult, ValidatorSetProvider,
};

/// Max submissions per validator inside one rate-limit window.
pub const MAX_SUBMISSIONS_PER_WINDOW: u32 = 10;

/// Rate-limit window length in blocks.
pub const RATE_LIMIT_WINDOW: u64 = 100;

/// Minimum blocks a validator must have been signing before submitting.
pub const MIN_VALIDATOR_AGE_BLOCKS: u64 = 1000;

/// Minimum blocks between an aggregation update and the next submission.
pub const MIN_BLOCKS_BETWEEN_SUBMISSIONS: u64 = 1;

/// Relative price move that arms the circuit breaker.
pub fn flash_loan_deviation() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

/// Run every pre-submission check. On success, returns the bonded
/// validator record so the caller can snapshot its power.
#[allow(clippy::too_many_arguments)]
pub fn check_submission<S, V>(
    store: &S,
    staking: &V,
    params: &OracleParams,
    events: &mut EventBag,
    feeder: &str,
    validator_id: &str,
    asset: &str,
    price: Decimal,
    height: u64,
    block_time: u64,
) -> OracleResult<BondedValidator>
where
    S: KvStore,
    V: ValidatorSetProvider + ?Sized,
{
    sanity::check_price_bounds(asset, price)?;

    let validator = staking
        .get_validator(validator_id)
        .filter(|v| v.bonded)
        .ok_or_else(|| OracleError::UnknownValidator(validator_id.to_string()))?;

    if !delegations::is_authorized_feeder(store, validator_id, feeder)? {
        return Err(OracleError::UnauthorizedFeeder {
            feeder: feeder.to_string(),
            validator: validator_id.to_string(),
        });
    }

    let power = validator.power(staking.power_reduction());
    if power < 1 {
        return Err(OracleError::BelowMinimumStake {
            validator: validator_id.to_string(),
            power,
        });
    }

    let age = staking
        .signing_info(&validator.consensus_id)
        .map(|info| height.saturating_sub(info.start_height));
    match age {
        Some(age) if age >= MIN_VALIDATOR_AGE_BLOCKS => {}
        _ => {
            return Err(OracleError::ValidatorTooYoung {
                validator: validator_id.to_string(),
                min_age: MIN_VALIDATOR_AGE_BLOCKS,
            })
        }
    }

    let window_start = height.saturating_sub(RATE_LIMIT_WINDOW - 1);
    let count = submissions::rate_limit_count(store, validator_id, window_start)?;
    if count >= MAX_SUBMISSIONS_PER_WINDOW {
        return Err(OracleError::RateLimited {
            validator: validator_id.to_string(),
            count,
            max: MAX_SUBMISSIONS_PER_WINDOW,
        });
    }
    let pair_count = submissions::rate_limit_pair_count(store, validator_id, asset, window_start)?;
    if pair_count >= MAX_SUBMISSIONS_PER_WINDOW / 2 {
        return Err(OracleError::RateLimited {
            validator: validator_id.to_string(),
            count: pair_count,
            max: MAX_SUBMISSIONS_PER_WINDOW / 2,
        });
    }

    if params.update_interval > 0 {
        if let Some(last) = submissions::get_latest(store, asset, validator_id)? {
            if block_time.saturating_sub(last.submitted_at) < params.update_interval {
                return Err(OracleError::SubmissionTooSoon {
                    validator: validator_id.to_string(),
                    asset: asset.to_string(),
                });
            }
        }
    }

    // Flash-loan guard: enforce update distance against the last
    // aggregation and latch the breaker on an extreme jump. The submission
    // itself stays admissible; the statistical filter judges its price.
    if let Some(aggregated) = prices::get_aggregated_price(store, asset)? {
        if height.saturating_sub(aggregated.block_height) < MIN_BLOCKS_BETWEEN_SUBMISSIONS {
            return Err(OracleError::SubmissionTooSoon {
                validator: validator_id.to_string(),
                asset: asset.to_string(),
            });
        }
        if !aggregated.price.is_zero() {
            let deviation = ((price - aggregated.price) / aggregated.price).abs();
            if deviation > flash_loan_deviation() && !breaker::is_breaker_armed(store)? {
                breaker::arm_breaker(
                    store,
                    events,
                    asset,
                    &format!("submission deviates {deviation} from last aggregate"),
                    height,
                )?;
            }
        }
    }

    Ok(validator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oc_01_state_store::InMemoryStore;
    use rust_decimal_macros::dec;
    use shared_types::ports::SigningInfo;
    use shared_types::AggregatedPrice;
    use std::collections::BTreeMap;

    /// Minimal staking stub: every configured validator is bonded with the
    /// same tokens and has signed since genesis.
    struct StubStaking {
        validators: BTreeMap<String, BondedValidator>,
        start_height: u64,
    }

    impl StubStaking {
        fn with_validators(ids: &[&str]) -> Self {
            let validators = ids
                .iter()
                .map(|id| {
                    (
                        id.to_string(),
                        BondedValidator {
                            id: id.to_string(),
                            consensus_id: format!("cons-{id}"),
                            tokens: 10_000_000,
                            bonded: true,
                        },
                    )
                })
                .collect();
            Self {
                validators,
                start_height: 0,
            }
        }
    }

    impl ValidatorSetProvider for StubStaking {
        fn iterate_bonded(&self) -> Vec<BondedValidator> {
            self.validators.values().cloned().collect()
        }

        fn get_validator(&self, id: &str) -> Option<BondedValidator> {
            self.validators.get(id).cloned()
        }

        fn power_reduction(&self) -> u128 {
            1_000_000
        }

        fn slash(
            &self,
            _consensus_id: &str,
            _infraction_height: u64,
            _power: u64,
            _fraction: Decimal,
        ) -> OracleResult<()> {
            Ok(())
        }

        fn jail(&self, _consensus_id: &str) -> OracleResult<()> {
            Ok(())
        }

        fn signing_info(&self, _consensus_id: &str) -> Option<SigningInfo> {
            Some(SigningInfo {
                start_height: self.start_height,
            })
        }
    }

    fn submit(
        store: &InMemoryStore,
        staking: &StubStaking,
        feeder: &str,
        validator: &str,
        price: Decimal,
        height: u64,
    ) -> OracleResult<BondedValidator> {
        let mut events = EventBag::new();
        check_submission(
            store,
            staking,
            &OracleParams::default(),
            &mut events,
            feeder,
            validator,
            "BTC",
            price,
            height,
            height * 6,
        )
    }

    #[test]
    fn test_happy_path() {
        let store = InMemoryStore::new();
        let staking = StubStaking::with_validators(&["val-1"]);
        let validator = submit(&store, &staking, "val-1", "val-1", dec!(100), 2000).unwrap();
        assert_eq!(validator.id, "val-1");
    }

    #[test]
    fn test_unknown_validator_rejected() {
        let store = InMemoryStore::new();
        let staking = StubStaking::with_validators(&["val-1"]);
        let err = submit(&store, &staking, "val-9", "val-9", dec!(100), 2000).unwrap_err();
        assert!(matches!(err, OracleError::UnknownValidator(_)));
    }

    #[test]
    fn test_unauthorized_feeder_rejected() {
        let store = InMemoryStore::new();
        let staking = StubStaking::with_validators(&["val-1"]);
        let err = submit(&store, &staking, "acct-2", "val-1", dec!(100), 2000).unwrap_err();
        assert!(matches!(err, OracleError::UnauthorizedFeeder { .. }));
    }

    #[test]
    fn test_young_validator_rejected() {
        let store = InMemoryStore::new();
        let mut staking = StubStaking::with_validators(&["val-1"]);
        staking.start_height = 1500;
        let err = submit(&store, &staking, "val-1", "val-1", dec!(100), 2000).unwrap_err();
        assert!(matches!(err, OracleError::ValidatorTooYoung { .. }));
    }

    #[test]
    fn test_rate_limit_window() {
        let store = InMemoryStore::new();
        let staking = StubStaking::with_validators(&["val-1"]);

        for i in 0..5 {
            oc_02_registry::submissions::record_rate_limit(&store, "val-1", "BTC", 2000 + i)
                .unwrap();
        }
        // Per-asset cap (5) is hit before the global cap (10).
        let err = submit(&store, &staking, "val-1", "val-1", dec!(100), 2010).unwrap_err();
        assert!(matches!(err, OracleError::RateLimited { max: 5, .. }));
    }

    #[test]
    fn test_flash_jump_arms_breaker_but_admits_submission() {
        let store = InMemoryStore::new();
        let staking = StubStaking::with_validators(&["val-1"]);
        prices::set_aggregated_price(
            &store,
            &AggregatedPrice {
                asset: "BTC".to_string(),
                price: dec!(10),
                block_height: 1990,
                block_time: 11940,
                contributors: 8,
            },
        )
        .unwrap();

        let mut events = EventBag::new();
        let result = check_submission(
            &store,
            &staking,
            &OracleParams::default(),
            &mut events,
            "val-1",
            "val-1",
            "BTC",
            dec!(16),
            2000,
            12000,
        );
        assert!(result.is_ok());
        assert!(breaker::is_breaker_armed(&store).unwrap());
        assert!(events
            .as_slice()
            .iter()
            .any(|e| e.name() == "circuit_breaker_triggered"));
    }

    #[test]
    fn test_same_block_as_aggregation_rejected() {
        let store = InMemoryStore::new();
        let staking = StubStaking::with_validators(&["val-1"]);
        prices::set_aggregated_price(
            &store,
            &AggregatedPrice {
                asset: "BTC".to_string(),
                price: dec!(100),
                block_height: 2000,
                block_time: 12000,
                contributors: 8,
            },
        )
        .unwrap();

        let err = submit(&store, &staking, "val-1", "val-1", dec!(100), 2000).unwrap_err();
        assert!(matches!(err, OracleError::SubmissionTooSoon { .. }));
    }
}
