//! # OC-03 Security - Gates, Circuit Breaker & Diversity
//!
//! ## Purpose
//!
//! Every anti-manipulation invariant that runs outside the statistical
//! filter: per-submission policy gates, the flash-loan guard, the global
//! circuit breaker, Byzantine-tolerance auditing, geographic diversity
//! monitoring, and the IP/ASN Sybil checks.
//!
//! ## Threat Model
//!
//! - A single whale pushing a price through raw stake weight
//!   (stake-concentration cap).
//! - Coordinated nodes in one region or one hosting provider
//!   (diversity score, IP/ASN caps).
//! - Flash-loan price spikes between consecutive blocks (minimum update
//!   distance + deviation latch).
//! - Submission flooding (height-window rate limits).
//!
//! Failures here are Policy or Security errors; none of them ever halts
//! the block.

pub mod audit;
pub mod breaker;
pub mod byzantine;
pub mod diversity;
pub mod gates;
pub mod geoip;
pub mod sanity;
pub mod sybil;

pub use audit::run_security_audit;
pub use breaker::{arm_breaker, breaker_state, is_breaker_armed, try_recover_breaker};
pub use gates::check_submission;
pub use geoip::CachedGeoIp;
