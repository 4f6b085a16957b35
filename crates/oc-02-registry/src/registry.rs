//! Validator oracle metadata rows.

use oc_01_state_store::{codec, keys, KvRead, KvStore};
use shared_types::{OracleResult, ValidatorOracle, ValidatorSetProvider};

pub fn get_validator_oracle<S: KvRead>(
    store: &S,
    validator: &str,
) -> OracleResult<Option<ValidatorOracle>> {
    match store.get(&keys::validator_oracle(validator))? {
        Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
        None => Ok(None),
    }
}

pub fn set_validator_oracle<S: KvStore>(store: &S, row: &ValidatorOracle) -> OracleResult<()> {
    store.set(keys::validator_oracle(&row.validator), codec::encode(row)?)
}

pub fn delete_validator_oracle<S: KvStore>(store: &S, validator: &str) -> OracleResult<()> {
    store.delete(&keys::validator_oracle(validator))
}

/// All metadata rows, ascending by validator id.
pub fn iterate_validator_oracles<S: KvRead>(store: &S) -> OracleResult<Vec<ValidatorOracle>> {
    store
        .prefix_scan(&keys::validator_oracle_prefix())?
        .iter()
        .map(|(_, v)| codec::decode(v))
        .collect()
}

/// Fetch-or-create a metadata row for a validator.
pub fn ensure_validator_oracle<S: KvStore>(
    store: &S,
    validator: &str,
) -> OracleResult<ValidatorOracle> {
    if let Some(row) = get_validator_oracle(store, validator)? {
        return Ok(row);
    }
    let row = ValidatorOracle::new(validator.to_string());
    set_validator_oracle(store, &row)?;
    Ok(row)
}

/// Bump the miss counter for a validator that skipped a vote period.
pub fn increment_miss_counter<S: KvStore>(store: &S, validator: &str) -> OracleResult<u64> {
    let mut row = ensure_validator_oracle(store, validator)?;
    row.miss_counter += 1;
    set_validator_oracle(store, &row)?;
    Ok(row.miss_counter)
}

pub fn reset_miss_counter<S: KvStore>(store: &S, validator: &str) -> OracleResult<()> {
    if let Some(mut row) = get_validator_oracle(store, validator)? {
        row.miss_counter = 0;
        set_validator_oracle(store, &row)?;
    }
    Ok(())
}

pub fn increment_submission_count<S: KvStore>(store: &S, validator: &str) -> OracleResult<()> {
    let mut row = ensure_validator_oracle(store, validator)?;
    row.total_submissions += 1;
    set_validator_oracle(store, &row)
}

/// Reconcile metadata rows against the staking view: create missing rows
/// for bonded validators, track the active flag, and delete rows only
/// when the validator has left staking entirely. A jailed validator drops
/// out of the bonded set but keeps its row (inactive) until unbond.
pub fn refresh_from_staking<S, V>(store: &S, staking: &V) -> OracleResult<()>
where
    S: KvStore,
    V: ValidatorSetProvider + ?Sized,
{
    for validator in staking.iterate_bonded() {
        let mut row = ensure_validator_oracle(store, &validator.id)?;
        if !row.active {
            row.active = true;
            set_validator_oracle(store, &row)?;
        }
    }

    for mut row in iterate_validator_oracles(store)? {
        match staking.get_validator(&row.validator) {
            None => delete_validator_oracle(store, &row.validator)?,
            Some(v) => {
                if row.active != v.bonded {
                    row.active = v.bonded;
                    set_validator_oracle(store, &row)?;
                }
            }
        }
    }
    Ok(())
}
