//! Vote-period voting-power snapshots and the cached total power.
//!
//! Aggregation joins submissions against the snapshot of the vote period
//! when one exists, so mid-period stake changes cannot skew an in-flight
//! vote.

use oc_01_state_store::{codec, keys, KvRead, KvStore};
use shared_types::{OracleResult, VotingPowerSnapshot};
use std::collections::BTreeMap;

/// Snapshots retained before pruning, in vote periods.
pub const SNAPSHOT_RETENTION_PERIODS: u64 = 10;

pub fn write_power_snapshot<S: KvStore>(
    store: &S,
    period: u64,
    powers: BTreeMap<String, u64>,
) -> OracleResult<VotingPowerSnapshot> {
    let snapshot = VotingPowerSnapshot::new(period, powers);
    store.set(keys::power_snapshot(period), codec::encode(&snapshot)?)?;
    Ok(snapshot)
}

pub fn get_power_snapshot<S: KvRead>(
    store: &S,
    period: u64,
) -> OracleResult<Option<VotingPowerSnapshot>> {
    match store.get(&keys::power_snapshot(period))? {
        Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
        None => Ok(None),
    }
}

/// Delete snapshots older than `current_period - SNAPSHOT_RETENTION_PERIODS`.
pub fn prune_power_snapshots<S: KvStore>(store: &S, current_period: u64) -> OracleResult<u64> {
    let horizon = current_period.saturating_sub(SNAPSHOT_RETENTION_PERIODS);
    let mut deleted = 0;
    for (key, value) in store.prefix_scan(&keys::power_snapshot_prefix())? {
        let snapshot: VotingPowerSnapshot = codec::decode(&value)?;
        if snapshot.period < horizon {
            store.delete(&key)?;
            deleted += 1;
        }
    }
    Ok(deleted)
}

/// Cache the bonded set's total consensus power for cheap reads.
pub fn set_total_power<S: KvStore>(store: &S, total: u64) -> OracleResult<()> {
    store.set(keys::total_power(), total.to_be_bytes().to_vec())
}

pub fn get_total_power<S: KvRead>(store: &S) -> OracleResult<Option<u64>> {
    Ok(store
        .get(&keys::total_power())?
        .and_then(|bytes| bytes.try_into().ok().map(u64::from_be_bytes)))
}
