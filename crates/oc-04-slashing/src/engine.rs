//! Outlier handling: history recording, penalty application, isolation of
//! downstream staking failures.

use crate::severity::{self, OUTLIER_REPUTATION_WINDOW};
use oc_01_state_store::{codec, keys, KvRead, KvStore};
use rust_decimal::Decimal;
use shared_types::{
    EventBag, FilteredOutlier, OracleEvent, OracleResult, OutlierHistoryEntry,
    ValidatorSetProvider,
};
use tracing::warn;

/// Count a validator's recorded outliers within the reputation window,
/// strictly before `current_height`.
pub fn outliers_in_window<S: KvRead>(
    store: &S,
    validator: &str,
    current_height: u64,
) -> OracleResult<u64> {
    let window_start = current_height.saturating_sub(OUTLIER_REPUTATION_WINDOW);
    let mut count = 0;
    for (key, _) in store.prefix_scan(&keys::outlier_history_validator_prefix(validator))? {
        let (_, _, height) = keys::parse_outlier_history(&key)?;
        if height >= window_start && height < current_height {
            count += 1;
        }
    }
    Ok(count)
}

/// Persist one outlier incident.
pub fn record_outlier<S: KvStore>(store: &S, entry: &OutlierHistoryEntry) -> OracleResult<()> {
    store.set(
        keys::outlier_history(&entry.validator, &entry.asset, entry.block_height),
        codec::encode(entry)?,
    )
}

/// All history entries for a validator, ascending by (asset, height).
pub fn history_for_validator<S: KvRead>(
    store: &S,
    validator: &str,
) -> OracleResult<Vec<OutlierHistoryEntry>> {
    store
        .prefix_scan(&keys::outlier_history_validator_prefix(validator))?
        .iter()
        .map(|(_, v)| codec::decode(v))
        .collect()
}

/// Process one filtered outlier: append history, escalate by reputation,
/// and apply the slash/jail through the staking sink.
///
/// The incident is recorded whether or not it triggers a penalty, and
/// whether or not staking accepts the penalty. Returns the applied slash
/// fraction, if any.
pub fn handle_outlier<S, V>(
    store: &S,
    staking: &V,
    events: &mut EventBag,
    outlier: &FilteredOutlier,
    base_fraction: Decimal,
    current_height: u64,
) -> OracleResult<Option<Decimal>>
where
    S: KvStore,
    V: ValidatorSetProvider + ?Sized,
{
    let prior = outliers_in_window(store, &outlier.validator, current_height)?;
    let decision = severity::decide(outlier.severity, prior, base_fraction);

    record_outlier(
        store,
        &OutlierHistoryEntry {
            validator: outlier.validator.clone(),
            asset: outlier.asset.clone(),
            block_height: outlier.block_height,
            severity: outlier.severity,
        },
    )?;
    events.emit(OracleEvent::ValidatorOutlierIncremented {
        validator: outlier.validator.clone(),
        outliers_in_window: prior + 1,
    });

    let Some(fraction) = decision.fraction else {
        return Ok(None);
    };

    let Some(validator) = staking.get_validator(&outlier.validator) else {
        warn!(
            validator = %outlier.validator,
            "outlier penalty skipped, validator left the staking set"
        );
        return Ok(None);
    };
    let power = validator.power(staking.power_reduction());

    if let Err(e) = staking.slash(
        &validator.consensus_id,
        outlier.block_height,
        power,
        fraction,
    ) {
        warn!(validator = %outlier.validator, error = %e, "staking rejected slash");
    }
    if decision.jail {
        if let Err(e) = staking.jail(&validator.consensus_id) {
            warn!(validator = %outlier.validator, error = %e, "staking rejected jail");
        }
    }

    events.emit(OracleEvent::SlashOutlier {
        validator: outlier.validator.clone(),
        asset: outlier.asset.clone(),
        severity: outlier.severity,
        fraction,
        jailed: decision.jail,
    });
    Ok(Some(fraction))
}
