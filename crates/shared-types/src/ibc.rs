//! # Cross-Chain Packet Schema
//!
//! Explicit schema for inbound price packets. The transport and the
//! ack/timeout surface live outside the core; only the payload contract is
//! fixed here: `asset` is required, `price` and `error` are optional, and
//! anything missing `asset` is rejected before it reaches the state
//! machine.

use crate::errors::{OracleError, OracleResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inbound price packet payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePacket {
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PricePacket {
    /// Decode and validate a JSON payload.
    pub fn decode(bytes: &[u8]) -> OracleResult<Self> {
        let packet: Self =
            serde_json::from_slice(bytes).map_err(|e| OracleError::Codec(e.to_string()))?;
        packet.validate()?;
        Ok(packet)
    }

    pub fn validate(&self) -> OracleResult<()> {
        if self.asset.is_empty() {
            return Err(OracleError::EmptyAsset);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_requires_asset() {
        let err = PricePacket::decode(br#"{"price": "100.5"}"#);
        assert!(err.is_err());

        let err = PricePacket::decode(br#"{"asset": "", "price": "100.5"}"#);
        assert_eq!(err, Err(OracleError::EmptyAsset));
    }

    #[test]
    fn test_decode_price_and_error_optional() {
        let ok = PricePacket::decode(br#"{"asset": "BTC"}"#).unwrap();
        assert_eq!(ok.asset, "BTC");
        assert!(ok.price.is_none());

        let ok = PricePacket::decode(br#"{"asset": "BTC", "error": "feed down"}"#).unwrap();
        assert_eq!(ok.error.as_deref(), Some("feed down"));
    }
}
