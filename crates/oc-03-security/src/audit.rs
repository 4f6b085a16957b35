//! The combined security audit: circuit-breaker recovery, Byzantine
//! tolerance, Sybil limits, and aggregate staleness.

use crate::{breaker, byzantine, sybil};
use oc_01_state_store::KvStore;
use oc_02_registry::{prices, registry};
use shared_types::{
    EventBag, OracleError, OracleParams, OracleResult, ValidatorSetProvider,
};

/// Run every security check in order and surface the first failure.
///
/// The recovery attempt always runs first, so an audit at or past the
/// recovery height both disarms the breaker and reports a clean result.
pub fn run_security_audit<S, V>(
    store: &S,
    staking: &V,
    params: &OracleParams,
    events: &mut EventBag,
    height: u64,
    block_time: u64,
) -> OracleResult<()>
where
    S: KvStore,
    V: ValidatorSetProvider + ?Sized,
{
    breaker::try_recover_breaker(store, events, height)?;
    if let Some(state) = breaker::breaker_state(store)? {
        if state.active {
            return Err(OracleError::CircuitBreakerActive {
                asset: state.triggered_by,
                triggered_height: state.triggered_height,
            });
        }
    }

    let bonded = staking.iterate_bonded();
    let oracles = registry::iterate_validator_oracles(store)?;
    byzantine::check_byzantine_tolerance(&bonded, &oracles, params)?;
    sybil::check_sybil_limits(&oracles, params, events)?;

    for asset in prices::tracked_assets(store)? {
        if let Some(aggregated) = prices::get_aggregated_price(store, &asset)? {
            if block_time.saturating_sub(aggregated.block_time) > params.expiry_duration {
                return Err(OracleError::StalePrice {
                    asset,
                    last_height: aggregated.block_height,
                });
            }
        }
    }

    Ok(())
}
