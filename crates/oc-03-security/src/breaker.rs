//! # Circuit Breaker
//!
//! Global latch that flags the oracle as untrusted for a fixed number of
//! blocks after extreme price movement.
//!
//! ## State Machine
//!
//! `Disarmed -> (extreme deviation) Armed -> (height >= recovery) Disarmed`
//!
//! Re-arming while armed updates the triggering asset and reason but keeps
//! the original trigger height, so the recovery deadline never extends.
//! Recovery uses the stored trigger height as an optimistic version: the
//! latch only clears when the state read at check time is still the state
//! in the store.

use oc_01_state_store::{codec, keys, KvRead, KvStore};
use shared_types::{CircuitBreakerState, EventBag, OracleEvent, OracleResult};
use tracing::warn;

/// Blocks between trip and automatic recovery eligibility.
pub const RECOVERY_BLOCKS: u64 = 100;

pub fn breaker_state<S: KvRead>(store: &S) -> OracleResult<Option<CircuitBreakerState>> {
    match store.get(&keys::circuit_breaker())? {
        Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
        None => Ok(None),
    }
}

pub fn is_breaker_armed<S: KvRead>(store: &S) -> OracleResult<bool> {
    Ok(breaker_state(store)?.map(|s| s.active).unwrap_or(false))
}

/// Arm the breaker, or refresh the trigger cause if already armed.
pub fn arm_breaker<S: KvStore>(
    store: &S,
    events: &mut EventBag,
    asset: &str,
    reason: &str,
    height: u64,
) -> OracleResult<()> {
    let state = match breaker_state(store)? {
        Some(mut existing) if existing.active => {
            existing.triggered_by = asset.to_string();
            existing.reason = reason.to_string();
            existing
        }
        _ => CircuitBreakerState {
            active: true,
            triggered_by: asset.to_string(),
            reason: reason.to_string(),
            triggered_height: height,
            recovery_height: height + RECOVERY_BLOCKS,
        },
    };

    warn!(
        asset,
        reason,
        recovery_height = state.recovery_height,
        "circuit breaker armed"
    );
    events.emit(OracleEvent::CircuitBreakerTriggered {
        asset: asset.to_string(),
        reason: reason.to_string(),
        triggered_height: state.triggered_height,
        recovery_height: state.recovery_height,
    });
    store.set(keys::circuit_breaker(), codec::encode(&state)?)
}

/// Disarm once the recovery height has passed.
///
/// Returns `true` when the latch cleared. The stored trigger height must
/// still equal the one observed at check time; a mismatch means another
/// trip happened in between and the latch stays.
pub fn try_recover_breaker<S: KvStore>(
    store: &S,
    events: &mut EventBag,
    height: u64,
) -> OracleResult<bool> {
    let Some(observed) = breaker_state(store)? else {
        return Ok(false);
    };
    if !observed.active || height < observed.recovery_height {
        return Ok(false);
    }

    // Optimistic CAS on the trigger height as version.
    let Some(current) = breaker_state(store)? else {
        return Ok(false);
    };
    if current.triggered_height != observed.triggered_height {
        return Ok(false);
    }

    store.delete(&keys::circuit_breaker())?;
    events.emit(OracleEvent::CircuitBreakerRecovered { height });
    Ok(true)
}
