//! Persisted oracle parameters. Reads fall back to defaults when no
//! parameter set was ever written; writes validate first and persist
//! nothing on failure.

use oc_01_state_store::{codec, keys, KvRead, KvStore};
use shared_types::{OracleParams, OracleResult};

pub fn get_params<S: KvRead>(store: &S) -> OracleResult<OracleParams> {
    match store.get(&keys::params())? {
        Some(bytes) => codec::decode(&bytes),
        None => Ok(OracleParams::default()),
    }
}

pub fn set_params<S: KvStore>(store: &S, params: &OracleParams) -> OracleResult<()> {
    params.validate()?;
    store.set(keys::params(), codec::encode(params)?)
}
