//! The oracle keeper: owned state handles plus the message-layer surface.

use oc_01_state_store::KvStore;
use oc_02_registry::{
    delegations, nonces, params_store, prices, registry, submissions,
};
use oc_03_security::{audit, diversity, gates, CachedGeoIp};
use oc_04_slashing::engine as slashing;
use oc_06_twap::{selector, TwapMethod, TwapResult};
use rust_decimal::Decimal;
use shared_types::{
    AggregatedPrice, BlockClock, CircuitBreakerState, EventBag, GeoIpProvider, OracleError,
    OracleEvent, OracleParams, OracleResult, OutlierHistoryEntry, PricePacket, PriceSnapshot,
    ValidatorOracle, ValidatorPrice, ValidatorSetProvider,
};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

/// Blocks an inbound packet nonce stays on record.
pub const NONCE_TTL_BLOCKS: u64 = 1000;

/// Constructor dependencies for [`OracleKeeper`].
pub struct OracleDependencies<S, V, C, G>
where
    S: KvStore,
    V: ValidatorSetProvider,
    C: BlockClock,
    G: GeoIpProvider,
{
    pub store: Arc<S>,
    pub staking: Arc<V>,
    pub clock: Arc<C>,
    pub geoip: G,
    /// Account allowed to update parameters.
    pub authority: String,
}

/// The oracle core's single entry point for the host chain.
pub struct OracleKeeper<S, V, C, G>
where
    S: KvStore,
    V: ValidatorSetProvider,
    C: BlockClock,
    G: GeoIpProvider,
{
    pub(crate) store: Arc<S>,
    pub(crate) staking: Arc<V>,
    pub(crate) clock: Arc<C>,
    pub(crate) geoip: CachedGeoIp<G>,
    authority: String,
    pub(crate) events: EventBag,
}

impl<S, V, C, G> OracleKeeper<S, V, C, G>
where
    S: KvStore,
    V: ValidatorSetProvider,
    C: BlockClock,
    G: GeoIpProvider,
{
    pub fn new(deps: OracleDependencies<S, V, C, G>) -> Self {
        Self {
            store: deps.store,
            staking: deps.staking,
            clock: deps.clock,
            geoip: CachedGeoIp::new(deps.geoip),
            authority: deps.authority,
            events: EventBag::new(),
        }
    }

    /// Take every event accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<OracleEvent> {
        self.events.drain()
    }

    /// Direct handle to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // === MESSAGE-LAYER OPERATIONS ===

    /// Submit one price. Runs every pre-submission gate, then records the
    /// submission, its history row, and the rate-limit record.
    pub fn submit_price(
        &mut self,
        feeder: &str,
        validator: &str,
        asset: &str,
        price: Decimal,
    ) -> OracleResult<()> {
        let height = self.clock.height();
        let block_time = self.clock.time();
        let params = params_store::get_params(self.store.as_ref())?;

        let bonded = gates::check_submission(
            self.store.as_ref(),
            self.staking.as_ref(),
            &params,
            &mut self.events,
            feeder,
            validator,
            asset,
            price,
            height,
            block_time,
        )?;

        let submission = ValidatorPrice {
            validator: validator.to_string(),
            asset: asset.to_string(),
            price,
            block_height: height,
            submitted_at: block_time,
            voting_power: bonded.power(self.staking.power_reduction()),
        };

        // Same block, same price: last-write-wins on an identical value,
        // leaving stored state untouched.
        let replay = submissions::get_latest(self.store.as_ref(), asset, validator)?
            .map(|prev| prev == submission)
            .unwrap_or(false);

        submissions::record_price(self.store.as_ref(), &submission)?;
        submissions::record_rate_limit(self.store.as_ref(), validator, asset, height)?;
        if !replay {
            registry::increment_submission_count(self.store.as_ref(), validator)?;
        }

        self.events.emit(OracleEvent::PriceSubmitted {
            validator: validator.to_string(),
            asset: asset.to_string(),
            price,
            height,
        });
        Ok(())
    }

    /// Register or update a validator's oracle metadata. Region, IP, and
    /// ASN feed the diversity and Sybil checks.
    pub fn register_validator_oracle(
        &mut self,
        validator: &str,
        region: &str,
        ip: &str,
        asn: u32,
    ) -> OracleResult<()> {
        let params = params_store::get_params(self.store.as_ref())?;

        if region.is_empty() {
            return Err(OracleError::UnknownRegion(String::new()));
        }
        if self
            .staking
            .get_validator(validator)
            .filter(|v| v.bonded)
            .is_none()
        {
            return Err(OracleError::UnknownValidator(validator.to_string()));
        }
        if !ip.is_empty() && ip.parse::<IpAddr>().is_err() {
            return Err(OracleError::InvalidIp(ip.to_string()));
        }

        if params.require_geographic_diversity {
            if !params.allowed_regions.contains(region) {
                return Err(OracleError::UnknownRegion(region.to_string()));
            }
            // Verify the claim when a GeoIP database is loaded; a nil
            // resolver skips verification entirely.
            if !ip.is_empty() {
                if let Some(resolved) = self.geoip.resolve(ip, self.clock.time()) {
                    if resolved != region {
                        return Err(OracleError::RegionMismatch {
                            claimed: region.to_string(),
                            resolved,
                        });
                    }
                }
            }
        }

        // Simulated-diversity gate over the other active validators.
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for row in registry::iterate_validator_oracles(self.store.as_ref())? {
            if row.active && row.validator != validator {
                *counts.entry(row.region.clone()).or_insert(0) += 1;
            }
        }
        diversity::check_registration(&counts, region, &params, &mut self.events)?;

        let mut row = registry::ensure_validator_oracle(self.store.as_ref(), validator)?;
        row.region = region.to_string();
        row.ip = ip.to_string();
        row.asn = asn;
        registry::set_validator_oracle(self.store.as_ref(), &row)?;
        info!(validator, region, "validator oracle registered");
        Ok(())
    }

    /// Bind a delegate feeder account to a validator.
    pub fn set_feeder_delegation(&mut self, validator: &str, delegate: &str) -> OracleResult<()> {
        if self.staking.get_validator(validator).is_none() {
            return Err(OracleError::UnknownValidator(validator.to_string()));
        }
        delegations::set_feeder_delegation(self.store.as_ref(), validator, delegate)
    }

    /// Replace the parameter set. Authority-gated; invalid parameters are
    /// rejected before anything is persisted.
    pub fn update_params(&mut self, authority: &str, params: OracleParams) -> OracleResult<()> {
        if authority != self.authority {
            return Err(OracleError::UnauthorizedParamUpdate(authority.to_string()));
        }
        params_store::set_params(self.store.as_ref(), &params)
    }

    /// Run the combined security audit at the current block.
    pub fn run_security_audit(&mut self) -> OracleResult<()> {
        let params = params_store::get_params(self.store.as_ref())?;
        audit::run_security_audit(
            self.store.as_ref(),
            self.staking.as_ref(),
            &params,
            &mut self.events,
            self.clock.height(),
            self.clock.time(),
        )
    }

    /// Validate an inbound cross-chain price packet: schema plus replay
    /// protection. Returns the decoded packet for the transport layer.
    pub fn accept_price_packet(&mut self, bytes: &[u8], nonce: &str) -> OracleResult<PricePacket> {
        let packet = PricePacket::decode(bytes)?;
        if nonces::nonce_seen(self.store.as_ref(), nonce)? {
            return Err(OracleError::Codec(format!("replayed nonce {nonce}")));
        }
        nonces::record_nonce(
            self.store.as_ref(),
            nonce,
            self.clock.height() + NONCE_TTL_BLOCKS,
        )?;
        Ok(packet)
    }

    // === QUERIES ===

    /// Latest aggregated price; `None` before the first aggregation.
    pub fn query_price(&self, asset: &str) -> OracleResult<Option<AggregatedPrice>> {
        prices::get_aggregated_price(self.store.as_ref(), asset)
    }

    pub fn query_twap(&self, asset: &str, method: Option<TwapMethod>) -> OracleResult<TwapResult> {
        selector::compute_twap(self.store.as_ref(), asset, method, self.clock.time())
    }

    pub fn query_snapshots(
        &self,
        asset: &str,
        from_height: u64,
        to_height: u64,
    ) -> OracleResult<Vec<PriceSnapshot>> {
        prices::snapshots_in_range(self.store.as_ref(), asset, from_height, to_height)
    }

    pub fn query_params(&self) -> OracleResult<OracleParams> {
        params_store::get_params(self.store.as_ref())
    }

    pub fn query_validator_oracle(&self, validator: &str) -> OracleResult<Option<ValidatorOracle>> {
        registry::get_validator_oracle(self.store.as_ref(), validator)
    }

    pub fn query_outlier_history(
        &self,
        validator: &str,
    ) -> OracleResult<Vec<OutlierHistoryEntry>> {
        slashing::history_for_validator(self.store.as_ref(), validator)
    }

    pub fn query_circuit_breaker(&self) -> OracleResult<Option<CircuitBreakerState>> {
        oc_03_security::breaker::breaker_state(self.store.as_ref())
    }
}
