//! # Error Types
//!
//! The shared error taxonomy of the oracle core. Every failure carries one
//! of six kinds; the block lifecycle driver never propagates any of them
//! out of begin/end block — it logs and continues.

use thiserror::Error;

/// Abstract failure categories, used for propagation policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input malformed; nothing persisted.
    Validation,
    /// Caller not permitted; surfaced to the caller.
    Policy,
    /// Too few submissions / voting power / validators; the affected asset
    /// is skipped without failing the block.
    Insufficient,
    /// Store decode or math failure; logged, conservative fallback applied.
    Corruption,
    /// The staking subsystem rejected a slash or jail.
    Staking,
    /// Byzantine-tolerance, circuit-breaker, or staleness audit failure.
    Security,
}

/// Errors produced by the oracle core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    // --- Validation ---
    #[error("empty asset identifier")]
    EmptyAsset,

    #[error("price {price} for {asset} outside sanity bounds")]
    PriceOutOfBounds { asset: String, price: String },

    #[error("invalid ip address: {0}")]
    InvalidIp(String),

    #[error("unknown region: {0}")]
    UnknownRegion(String),

    #[error("claimed region {claimed} does not match resolved region {resolved}")]
    RegionMismatch { claimed: String, resolved: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },

    // --- Policy ---
    #[error("unknown validator: {0}")]
    UnknownValidator(String),

    #[error("account {feeder} is not authorized to feed for {validator}")]
    UnauthorizedFeeder { feeder: String, validator: String },

    #[error("delegate {delegate} is already bound to validator {bound_to}")]
    DelegateAlreadyBound { delegate: String, bound_to: String },

    #[error("rate limit exceeded for {validator}: {count}/{max} submissions in window")]
    RateLimited {
        validator: String,
        count: u32,
        max: u32,
    },

    #[error("submission interval not elapsed for {validator}/{asset}")]
    SubmissionTooSoon { validator: String, asset: String },

    #[error("validator {validator} power {power} below minimum stake")]
    BelowMinimumStake { validator: String, power: u64 },

    #[error("validator {validator} is younger than {min_age} blocks")]
    ValidatorTooYoung { validator: String, min_age: u64 },

    #[error("unauthorized parameter update by {0}")]
    UnauthorizedParamUpdate(String),

    #[error("registration refused: region {region} would break diversity requirements")]
    DiversityRefusal { region: String },

    // --- Insufficient ---
    #[error("no submissions for asset {0}")]
    NoSubmissions(String),

    #[error("insufficient submitted power for {asset}: {submitted}/{total}")]
    InsufficientPower {
        asset: String,
        submitted: u64,
        total: u64,
    },

    #[error("all prices filtered for asset {0}")]
    AllFiltered(String),

    #[error("not enough snapshots for {asset}: have {have}, need {need}")]
    InsufficientSnapshots {
        asset: String,
        have: usize,
        need: usize,
    },

    // --- Corruption ---
    #[error("store codec failure: {0}")]
    Codec(String),

    #[error("malformed store key under prefix {prefix:#04x}")]
    MalformedKey { prefix: u8 },

    #[error("math failure: {0}")]
    Math(String),

    #[error("time interval overflow: {0}")]
    IntervalOverflow(String),

    // --- Staking ---
    #[error("staking rejected {op} for {consensus_id}: {reason}")]
    StakingRejected {
        op: &'static str,
        consensus_id: String,
        reason: String,
    },

    // --- Security ---
    #[error("circuit breaker active, triggered by {asset} at height {triggered_height}")]
    CircuitBreakerActive {
        asset: String,
        triggered_height: u64,
    },

    #[error("only {count} bonded validators, minimum {minimum} required")]
    TooFewValidators { count: usize, minimum: usize },

    #[error("validator {validator} holds {share} of stake, above the concentration cap")]
    StakeConcentration { validator: String, share: String },

    #[error("only {count} distinct regions among bonded validators, minimum {minimum}")]
    InsufficientRegions { count: usize, minimum: usize },

    #[error("ip {ip} hosts {count} validators, maximum {max}")]
    IpConcentration { ip: String, count: usize, max: usize },

    #[error("asn {asn} hosts {count} validators, maximum {max}")]
    AsnConcentration { asn: u32, count: usize, max: usize },

    #[error("aggregated price for {asset} is stale since height {last_height}")]
    StalePrice { asset: String, last_height: u64 },
}

impl OracleError {
    /// Map to the abstract §-level failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyAsset
            | Self::PriceOutOfBounds { .. }
            | Self::InvalidIp(_)
            | Self::UnknownRegion(_)
            | Self::RegionMismatch { .. }
            | Self::InvalidParam { .. } => ErrorKind::Validation,

            Self::UnknownValidator(_)
            | Self::UnauthorizedFeeder { .. }
            | Self::DelegateAlreadyBound { .. }
            | Self::RateLimited { .. }
            | Self::SubmissionTooSoon { .. }
            | Self::BelowMinimumStake { .. }
            | Self::ValidatorTooYoung { .. }
            | Self::UnauthorizedParamUpdate(_)
            | Self::DiversityRefusal { .. } => ErrorKind::Policy,

            Self::NoSubmissions(_)
            | Self::InsufficientPower { .. }
            | Self::AllFiltered(_)
            | Self::InsufficientSnapshots { .. } => ErrorKind::Insufficient,

            Self::Codec(_)
            | Self::MalformedKey { .. }
            | Self::Math(_)
            | Self::IntervalOverflow(_) => ErrorKind::Corruption,

            Self::StakingRejected { .. } => ErrorKind::Staking,

            Self::CircuitBreakerActive { .. }
            | Self::TooFewValidators { .. }
            | Self::StakeConcentration { .. }
            | Self::InsufficientRegions { .. }
            | Self::IpConcentration { .. }
            | Self::AsnConcentration { .. }
            | Self::StalePrice { .. } => ErrorKind::Security,
        }
    }
}

pub type OracleResult<T> = Result<T, OracleError>;
