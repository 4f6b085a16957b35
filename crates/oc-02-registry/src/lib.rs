//! # OC-02 Registry - Validator Metadata & Submission Log
//!
//! ## Purpose
//!
//! Keyed access to the oracle's bookkeeping state: per-validator metadata
//! rows, the per-(asset, validator) submission log with trailing history,
//! rate-limit records, feeder delegations, vote-period voting-power
//! snapshots, and the persisted parameter set.
//!
//! ## Conventions
//!
//! Every function is a thin, typed wrapper over the oc-01 key layout.
//! Reads accept any [`KvRead`](oc_01_state_store::KvRead) so aggregation
//! workers can call them against immutable cache views; writes require the
//! full [`KvStore`](oc_01_state_store::KvStore).

pub mod delegations;
pub mod nonces;
pub mod params_store;
pub mod powers;
pub mod prices;
pub mod registry;
pub mod submissions;

pub use registry::{
    delete_validator_oracle, get_validator_oracle, iterate_validator_oracles,
    set_validator_oracle,
};
