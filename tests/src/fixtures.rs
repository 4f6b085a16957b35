//! Shared fixtures: a recording mock of the staking subsystem, a manually
//! driven block clock, and a static GeoIP resolver.

use oc_01_state_store::InMemoryStore;
use oc_02_registry::registry;
use oc_07_lifecycle::{OracleDependencies, OracleKeeper};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use shared_types::ports::SigningInfo;
use shared_types::{BlockClock, BondedValidator, GeoIpProvider, OracleResult, ValidatorOracle, ValidatorSetProvider};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Seconds of block time per block in every fixture.
pub const BLOCK_SECS: u64 = 6;

/// Regions cycled across fixture validators.
pub const FIXTURE_REGIONS: [&str; 3] = ["north_america", "europe", "asia"];

// =============================================================================
// MOCK STAKING
// =============================================================================

/// Recording staking mock: a configurable bonded set plus captured
/// slash/jail calls.
#[derive(Default)]
pub struct MockStaking {
    validators: RwLock<BTreeMap<String, BondedValidator>>,
    pub slashes: Mutex<Vec<(String, Decimal)>>,
    pub jails: Mutex<Vec<String>>,
}

impl MockStaking {
    /// `n` bonded validators with equal stake.
    pub fn with_equal_powers(n: usize) -> Self {
        let validators = (0..n)
            .map(|i| {
                let id = format!("val-{i}");
                (
                    id.clone(),
                    BondedValidator {
                        consensus_id: format!("cons-{id}"),
                        id,
                        tokens: 1_000_000,
                        bonded: true,
                    },
                )
            })
            .collect();
        Self {
            validators: RwLock::new(validators),
            ..Default::default()
        }
    }

    pub fn set_tokens(&self, id: &str, tokens: u128) {
        if let Some(v) = self.validators.write().get_mut(id) {
            v.tokens = tokens;
        }
    }

    pub fn jailed(&self, id: &str) -> bool {
        self.jails.lock().iter().any(|j| j == &format!("cons-{id}"))
    }
}

impl ValidatorSetProvider for MockStaking {
    fn iterate_bonded(&self) -> Vec<BondedValidator> {
        self.validators
            .read()
            .values()
            .filter(|v| v.bonded)
            .cloned()
            .collect()
    }

    fn get_validator(&self, id: &str) -> Option<BondedValidator> {
        self.validators.read().get(id).cloned()
    }

    fn power_reduction(&self) -> u128 {
        1_000_000
    }

    fn slash(
        &self,
        consensus_id: &str,
        _infraction_height: u64,
        _power: u64,
        fraction: Decimal,
    ) -> OracleResult<()> {
        self.slashes
            .lock()
            .push((consensus_id.to_string(), fraction));
        Ok(())
    }

    fn jail(&self, consensus_id: &str) -> OracleResult<()> {
        self.jails.lock().push(consensus_id.to_string());
        // Jailing moves the validator out of the bonded set.
        let mut validators = self.validators.write();
        if let Some(v) = validators
            .values_mut()
            .find(|v| v.consensus_id == consensus_id)
        {
            v.bonded = false;
        }
        Ok(())
    }

    fn signing_info(&self, _consensus_id: &str) -> Option<SigningInfo> {
        Some(SigningInfo { start_height: 0 })
    }
}

// =============================================================================
// MANUAL CLOCK
// =============================================================================

/// Deterministic block clock driven by the test.
pub struct ManualClock {
    height: AtomicU64,
    time: AtomicU64,
}

impl ManualClock {
    pub fn at(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
            time: AtomicU64::new(height * BLOCK_SECS),
        }
    }

    /// Advance `blocks`, moving time in lockstep.
    pub fn advance(&self, blocks: u64) {
        let height = self.height.fetch_add(blocks, Ordering::SeqCst) + blocks;
        self.time.store(height * BLOCK_SECS, Ordering::SeqCst);
    }
}

impl BlockClock for ManualClock {
    fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    fn time(&self) -> u64 {
        self.time.load(Ordering::SeqCst)
    }
}

// =============================================================================
// STATIC GEOIP
// =============================================================================

/// Fixed IP -> region table.
#[derive(Default)]
pub struct StaticGeoIp {
    regions: BTreeMap<String, String>,
}

impl StaticGeoIp {
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        Self {
            regions: entries
                .iter()
                .map(|(ip, region)| (ip.to_string(), region.to_string()))
                .collect(),
        }
    }
}

impl GeoIpProvider for StaticGeoIp {
    fn region(&self, ip: &str) -> Option<String> {
        self.regions.get(ip).cloned()
    }
}

// =============================================================================
// ORACLE UNDER TEST
// =============================================================================

pub type TestKeeper = OracleKeeper<InMemoryStore, MockStaking, ManualClock, StaticGeoIp>;

pub struct TestOracle {
    pub store: Arc<InMemoryStore>,
    pub staking: Arc<MockStaking>,
    pub clock: Arc<ManualClock>,
    pub keeper: TestKeeper,
}

/// A ready oracle: `n` equal-power validators with metadata rows cycling
/// through three regions, clock parked at `height`.
pub fn oracle_with_validators(n: usize, height: u64) -> TestOracle {
    let store = Arc::new(InMemoryStore::new());
    let staking = Arc::new(MockStaking::with_equal_powers(n));
    let clock = Arc::new(ManualClock::at(height));

    for i in 0..n {
        let mut row = ValidatorOracle::new(format!("val-{i}"));
        row.region = FIXTURE_REGIONS[i % FIXTURE_REGIONS.len()].to_string();
        row.ip = format!("10.0.{i}.1");
        row.asn = 64_000 + i as u32;
        registry::set_validator_oracle(store.as_ref(), &row).unwrap();
    }

    let keeper = OracleKeeper::new(OracleDependencies {
        store: Arc::clone(&store),
        staking: Arc::clone(&staking),
        clock: Arc::clone(&clock),
        geoip: StaticGeoIp::default(),
        authority: "gov".to_string(),
    });

    TestOracle {
        store,
        staking,
        clock,
        keeper,
    }
}

/// Submit a price for every validator, then run one block boundary.
pub fn submit_round(oracle: &mut TestOracle, asset: &str, prices: &[Decimal]) {
    for (i, price) in prices.iter().enumerate() {
        let id = format!("val-{i}");
        oracle
            .keeper
            .submit_price(&id, &id, asset, *price)
            .unwrap_or_else(|e| panic!("submission for {id} failed: {e}"));
    }
    oracle.clock.advance(1);
    oracle.keeper.begin_block();
    oracle.keeper.end_block();
}
