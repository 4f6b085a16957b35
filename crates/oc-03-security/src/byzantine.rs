//! Byzantine-tolerance preconditions for trusting the oracle at all.

use rust_decimal::Decimal;
use shared_types::{BondedValidator, OracleError, OracleParams, OracleResult, ValidatorOracle};
use std::collections::BTreeSet;

/// Minimum bonded validators before the oracle output is considered
/// Byzantine-tolerant.
pub const MIN_VALIDATORS_FOR_SECURITY: usize = 7;

/// Maximum admissible share of total stake for any single validator.
pub fn max_stake_share() -> Decimal {
    Decimal::new(20, 2) // 0.20
}

/// Check validator-count, stake-concentration, and region minimums.
pub fn check_byzantine_tolerance(
    bonded: &[BondedValidator],
    oracles: &[ValidatorOracle],
    params: &OracleParams,
) -> OracleResult<()> {
    if bonded.len() < MIN_VALIDATORS_FOR_SECURITY {
        return Err(OracleError::TooFewValidators {
            count: bonded.len(),
            minimum: MIN_VALIDATORS_FOR_SECURITY,
        });
    }

    let total_tokens: u128 = bonded.iter().map(|v| v.tokens).sum();
    if total_tokens > 0 {
        for validator in bonded {
            // share > 0.20 <=> tokens * 5 > total, exact in integer math.
            if validator.tokens.saturating_mul(5) > total_tokens {
                let basis_points = validator.tokens.saturating_mul(10_000) / total_tokens;
                let share = Decimal::new(basis_points as i64, 4);
                return Err(OracleError::StakeConcentration {
                    validator: validator.id.clone(),
                    share: share.to_string(),
                });
            }
        }
    }

    let bonded_ids: BTreeSet<&str> = bonded.iter().map(|v| v.id.as_str()).collect();
    let regions: BTreeSet<&str> = oracles
        .iter()
        .filter(|o| bonded_ids.contains(o.validator.as_str()))
        .map(|o| o.region.as_str())
        .filter(|r| params.allowed_regions.contains(*r))
        .collect();
    if regions.len() < params.min_geographic_regions as usize {
        return Err(OracleError::InsufficientRegions {
            count: regions.len(),
            minimum: params.min_geographic_regions as usize,
        });
    }

    Ok(())
}
