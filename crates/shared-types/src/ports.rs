//! # Outbound Ports
//!
//! Traits through which the oracle core consumes its collaborators: the
//! staking subsystem, the deterministic block clock, and the GeoIP region
//! mapper. Production adapters live with the host chain; the test suite
//! provides in-memory implementations.

use crate::entities::BondedValidator;
use crate::errors::OracleResult;
use rust_decimal::Decimal;

/// Slashing-relevant signing metadata for one validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningInfo {
    /// Height at which the validator joined the signing set.
    pub start_height: u64,
}

/// Read-only view of the bonded validator set plus the slashing sink.
pub trait ValidatorSetProvider: Send + Sync {
    /// All currently bonded validators. Order is not specified; callers
    /// that need determinism must sort by operator id.
    fn iterate_bonded(&self) -> Vec<BondedValidator>;

    /// Look up a validator by operator id, bonded or not.
    fn get_validator(&self, id: &str) -> Option<BondedValidator>;

    /// Token-to-consensus-power divisor.
    fn power_reduction(&self) -> u128;

    /// Slash `fraction` of the stake backing `consensus_id` at the given
    /// infraction height.
    fn slash(
        &self,
        consensus_id: &str,
        infraction_height: u64,
        power: u64,
        fraction: Decimal,
    ) -> OracleResult<()>;

    /// Jail the validator, removing it from the active set.
    fn jail(&self, consensus_id: &str) -> OracleResult<()>;

    /// Signing metadata, if the validator has ever signed.
    fn signing_info(&self, consensus_id: &str) -> Option<SigningInfo>;
}

/// Deterministic block height and time.
pub trait BlockClock: Send + Sync {
    fn height(&self) -> u64;
    /// Block time as unix seconds.
    fn time(&self) -> u64;
}

/// IP to geographic region mapping, deterministic on database content.
///
/// Returning `None` means no database is loaded or the address is unknown;
/// callers then fall back to the validator's claimed region.
pub trait GeoIpProvider: Send + Sync {
    fn region(&self, ip: &str) -> Option<String>;
}

/// Provider that never resolves a region. Used when no GeoIP database is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoIp;

impl GeoIpProvider for NoGeoIp {
    fn region(&self, _ip: &str) -> Option<String> {
        None
    }
}
