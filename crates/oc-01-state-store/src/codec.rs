//! Value encoding for persisted entities.
//!
//! All stored values are bincode-encoded serde structs. Decode failures
//! surface as Corruption-kind errors; callers log, count, and fall back
//! rather than halt the block.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{OracleError, OracleResult};

pub fn encode<T: Serialize>(value: &T) -> OracleResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| OracleError::Codec(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> OracleResult<T> {
    bincode::deserialize(bytes).map_err(|e| OracleError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::PriceSnapshot;

    #[test]
    fn test_round_trip() {
        let snapshot = PriceSnapshot {
            asset: "BTC".to_string(),
            price: rust_decimal_macros::dec!(42000.5),
            block_height: 77,
            block_time: 1_700_000_000,
        };
        let bytes = encode(&snapshot).unwrap();
        let back: PriceSnapshot = decode(&bytes).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_truncated_value_is_corruption() {
        let err = decode::<PriceSnapshot>(&[0x01, 0x02]).unwrap_err();
        assert!(matches!(err, OracleError::Codec(_)));
    }
}
