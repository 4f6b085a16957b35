//! Begin- and end-block sequences. Every step is failure-isolated: a
//! broken step logs and the block proceeds.

use crate::keeper::OracleKeeper;
use oc_01_state_store::KvStore;
use oc_02_registry::{params_store, powers, prices, registry, submissions, nonces};
use oc_03_security::diversity;
use oc_04_slashing::{cleanup, misses};
use oc_05_aggregation::engine as aggregation;
use shared_types::{
    BlockClock, GeoIpProvider, OracleEvent, OracleResult, ValidatorSetProvider,
};
use std::collections::BTreeMap;
use tracing::warn;

/// Cadence of the GeoIP cache sweep in blocks.
pub const GEOIP_PRUNE_INTERVAL: u64 = 100;

macro_rules! isolated {
    ($step:expr, $body:expr) => {
        if let Err(e) = $body {
            warn!(step = $step, error = %e, "block step failed, continuing");
        }
    };
}

impl<S, V, C, G> OracleKeeper<S, V, C, G>
where
    S: KvStore,
    V: ValidatorSetProvider,
    C: BlockClock,
    G: GeoIpProvider,
{
    /// Begin-block sequence: aggregation, voting-power refresh, diversity
    /// monitor, GeoIP sweep, vote-period snapshot.
    pub fn begin_block(&mut self) {
        let height = self.clock.height();
        let block_time = self.clock.time();
        self.events.emit(OracleEvent::OracleBeginBlock { height });

        isolated!("aggregate_prices", self.aggregate_prices(height, block_time));
        isolated!("refresh_validator_state", self.refresh_validator_state());
        isolated!("diversity_monitor", self.maybe_run_diversity_monitor(height));

        if height % GEOIP_PRUNE_INTERVAL == 0 {
            self.geoip.prune_expired(block_time);
        }

        isolated!("power_snapshot", self.maybe_snapshot_powers(height));
    }

    /// End-block sequence: slash-window accounting, amortized history
    /// cleanup, submission and nonce pruning.
    pub fn end_block(&mut self) {
        let height = self.clock.height();

        isolated!("slash_window", self.run_slash_window(height));
        isolated!(
            "outlier_cleanup",
            cleanup::run_amortized_cleanup(self.store.as_ref(), height)
        );
        isolated!("prune_submissions", self.prune_submission_state(height));
        isolated!(
            "prune_nonces",
            nonces::prune_expired_nonces(self.store.as_ref(), height)
        );

        self.events.emit(OracleEvent::OracleEndBlock { height });
    }

    fn aggregate_prices(&mut self, height: u64, block_time: u64) -> OracleResult<()> {
        aggregation::run_aggregation(
            self.store.as_ref(),
            self.staking.as_ref(),
            &mut self.events,
            height,
            block_time,
        )?;
        Ok(())
    }

    /// Refresh the cached total power and the per-validator oracle rows
    /// from the staking set.
    fn refresh_validator_state(&mut self) -> OracleResult<()> {
        let bonded = self.staking.iterate_bonded();
        let reduction = self.staking.power_reduction();
        let total: u64 = bonded.iter().map(|v| v.power(reduction)).sum();
        powers::set_total_power(self.store.as_ref(), total)?;
        registry::refresh_from_staking(self.store.as_ref(), self.staking.as_ref())
    }

    fn maybe_run_diversity_monitor(&mut self, height: u64) -> OracleResult<()> {
        let params = params_store::get_params(self.store.as_ref())?;
        if params.diversity_check_interval == 0 || height % params.diversity_check_interval != 0 {
            return Ok(());
        }

        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for row in registry::iterate_validator_oracles(self.store.as_ref())? {
            if row.active {
                *counts.entry(row.region.clone()).or_insert(0) += 1;
            }
        }
        diversity::run_diversity_monitor(&counts, &params, &mut self.events);
        Ok(())
    }

    /// At the first block of a vote period, freeze per-validator powers
    /// and drop snapshots past the retention horizon.
    fn maybe_snapshot_powers(&mut self, height: u64) -> OracleResult<()> {
        let params = params_store::get_params(self.store.as_ref())?;
        if !params.is_vote_period_start(height) {
            return Ok(());
        }

        let period = params.vote_period_index(height);
        let reduction = self.staking.power_reduction();
        let table: BTreeMap<String, u64> = self
            .staking
            .iterate_bonded()
            .into_iter()
            .map(|v| {
                let power = v.power(reduction);
                (v.id, power)
            })
            .collect();
        let snapshot = powers::write_power_snapshot(self.store.as_ref(), period, table)?;
        self.events.emit(OracleEvent::VotingPowerSnapshot {
            period,
            validators: snapshot.powers.len() as u32,
            total_power: snapshot.total_power,
        });
        powers::prune_power_snapshots(self.store.as_ref(), period)?;
        Ok(())
    }

    fn run_slash_window(&mut self, height: u64) -> OracleResult<()> {
        let params = params_store::get_params(self.store.as_ref())?;
        if height % params.vote_period != 0 {
            return Ok(());
        }

        for asset in prices::tracked_assets(self.store.as_ref())? {
            misses::account_missed_votes(
                self.store.as_ref(),
                self.staking.as_ref(),
                &params,
                &asset,
                height,
            )?;
        }
        if height % params.slash_window == 0 {
            misses::evaluate_slash_window(
                self.store.as_ref(),
                self.staking.as_ref(),
                &params,
                height,
            )?;
        }
        Ok(())
    }

    fn prune_submission_state(&mut self, height: u64) -> OracleResult<()> {
        let cutoff = height.saturating_sub(submissions::SUBMISSION_RETENTION_BLOCKS);
        if cutoff == 0 {
            return Ok(());
        }
        submissions::prune_older_than(self.store.as_ref(), cutoff)?;
        submissions::prune_rate_limits(self.store.as_ref(), cutoff)?;
        Ok(())
    }
}
