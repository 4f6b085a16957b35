//! Replay nonces for inbound cross-chain packets, expired by height.

use oc_01_state_store::{keys, KvRead, KvStore};
use shared_types::OracleResult;

/// Record a nonce with the height at which it expires.
pub fn record_nonce<S: KvStore>(store: &S, nonce: &str, expiry_height: u64) -> OracleResult<()> {
    store.set(keys::ibc_nonce(nonce), expiry_height.to_be_bytes().to_vec())
}

pub fn nonce_seen<S: KvRead>(store: &S, nonce: &str) -> OracleResult<bool> {
    store.has(&keys::ibc_nonce(nonce))
}

/// Delete nonces whose expiry height has passed. Returns the count.
pub fn prune_expired_nonces<S: KvStore>(store: &S, current_height: u64) -> OracleResult<u64> {
    let mut stale_keys = Vec::new();
    for (key, value) in store.prefix_scan(&keys::ibc_nonce_all())? {
        let expiry = value
            .try_into()
            .ok()
            .map(u64::from_be_bytes)
            .unwrap_or(0);
        if expiry <= current_height {
            stale_keys.push(key);
        }
    }
    let deleted = stale_keys.len() as u64;
    for key in stale_keys {
        store.delete(&key)?;
    }
    Ok(deleted)
}
