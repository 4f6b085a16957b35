//! Feeder delegations: validator -> delegate account, one-to-one.
//!
//! A reverse index under its own prefix enforces that a delegate account
//! is never bound to two validators.

use oc_01_state_store::{codec, keys, KvRead, KvStore};
use shared_types::{FeederDelegation, OracleError, OracleResult};

/// Bind `delegate` as the feeder for `validator`.
///
/// Rebinding the same validator to a new delegate releases the old one.
/// Binding a delegate that already feeds for a different validator fails
/// with a Policy error and writes nothing.
pub fn set_feeder_delegation<S: KvStore>(
    store: &S,
    validator: &str,
    delegate: &str,
) -> OracleResult<()> {
    if let Some(bound_to) = validator_for_delegate(store, delegate)? {
        if bound_to != validator {
            return Err(OracleError::DelegateAlreadyBound {
                delegate: delegate.to_string(),
                bound_to,
            });
        }
    }

    if let Some(previous) = get_feeder_delegation(store, validator)? {
        if previous.delegate != delegate {
            store.delete(&keys::feeder_reverse(&previous.delegate))?;
        }
    }

    let delegation = FeederDelegation {
        validator: validator.to_string(),
        delegate: delegate.to_string(),
    };
    store.set(keys::feeder_delegation(validator), codec::encode(&delegation)?)?;
    store.set(keys::feeder_reverse(delegate), validator.as_bytes().to_vec())
}

pub fn get_feeder_delegation<S: KvRead>(
    store: &S,
    validator: &str,
) -> OracleResult<Option<FeederDelegation>> {
    match store.get(&keys::feeder_delegation(validator))? {
        Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
        None => Ok(None),
    }
}

pub fn validator_for_delegate<S: KvRead>(
    store: &S,
    delegate: &str,
) -> OracleResult<Option<String>> {
    match store.get(&keys::feeder_reverse(delegate))? {
        Some(bytes) => Ok(Some(
            String::from_utf8(bytes)
                .map_err(|_| OracleError::MalformedKey { prefix: keys::FEEDER_REVERSE })?,
        )),
        None => Ok(None),
    }
}

/// Whether `account` may feed for `validator`: either the operator account
/// itself or the recorded delegate.
pub fn is_authorized_feeder<S: KvRead>(
    store: &S,
    validator: &str,
    account: &str,
) -> OracleResult<bool> {
    if validator == account {
        return Ok(true);
    }
    Ok(get_feeder_delegation(store, validator)?
        .map(|d| d.delegate == account)
        .unwrap_or(false))
}
