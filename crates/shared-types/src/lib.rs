//! # Shared Types Crate
//!
//! This crate contains all domain entities, the governable parameter set,
//! the typed event surface, and the outbound ports of the oracle core.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **String Identity**: Validators, feeders, and assets are referenced by
//!   stable string IDs, never by in-memory pointers.
//! - **Deterministic Arithmetic**: Every consensus-observable number is a
//!   fixed-precision [`Decimal`](rust_decimal::Decimal); floats are banned.

pub mod decimal;
pub mod entities;
pub mod errors;
pub mod events;
pub mod ibc;
pub mod params;
pub mod ports;

pub use decimal::{approx_sqrt, MathError};
pub use entities::*;
pub use errors::{ErrorKind, OracleError, OracleResult};
pub use events::{EventBag, OracleEvent};
pub use ibc::PricePacket;
pub use params::OracleParams;
pub use ports::{BlockClock, GeoIpProvider, SigningInfo, ValidatorSetProvider};
