//! Output normalization strategies.
//!
//! Each strategy maps `(raw_value, request_id)` to the value handed to the
//! host program. The strategy is picked once when a coordinator is built.
//!
//! | Method               | Output                                                        |
//! |----------------------|---------------------------------------------------------------|
//! | `HyperEfficient`     | `request_id + raw_value` (wrapping mod 2^256)                 |
//! | `HashWithRequestId`  | `sha256(request_id_be || raw_value_be)`                       |
//! | `MostNormalized`     | `sha256(block_hash(current - request_id % 256) || raw_value_be)` |

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::block_history::{BlockHistory, BLOCK_HASH_WINDOW, ZERO_HASH};
use crate::errors::CoordinatorError;

/// Normalization method, fixed per coordinator instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum NormalizationMethod {
    /// Wrapping addition of the request id. Cheapest, weakest mixing.
    #[default]
    HyperEfficient = 0,
    /// One hash over the request id and raw value.
    HashWithRequestId = 1,
    /// One hash over a recent block fingerprint and the raw value.
    MostNormalized = 2,
}

impl NormalizationMethod {
    pub const ALL: [NormalizationMethod; 3] = [
        NormalizationMethod::HyperEfficient,
        NormalizationMethod::HashWithRequestId,
        NormalizationMethod::MostNormalized,
    ];

    /// Normalize `raw_value` for `request_id`.
    ///
    /// `history` is only consulted by [`NormalizationMethod::MostNormalized`].
    pub fn normalize(
        self,
        raw_value: U256,
        request_id: U256,
        history: &dyn BlockHistory,
    ) -> U256 {
        match self {
            NormalizationMethod::HyperEfficient => hyper_efficient(raw_value, request_id),
            NormalizationMethod::HashWithRequestId => hash_with_request_id(raw_value, request_id),
            NormalizationMethod::MostNormalized => most_normalized(raw_value, request_id, history),
        }
    }
}

impl TryFrom<u8> for NormalizationMethod {
    type Error = CoordinatorError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NormalizationMethod::HyperEfficient),
            1 => Ok(NormalizationMethod::HashWithRequestId),
            2 => Ok(NormalizationMethod::MostNormalized),
            other => Err(CoordinatorError::InvalidNormalizationMethod(other)),
        }
    }
}

impl From<NormalizationMethod> for u8 {
    fn from(method: NormalizationMethod) -> Self {
        method as u8
    }
}

fn hyper_efficient(raw_value: U256, request_id: U256) -> U256 {
    request_id.overflowing_add(raw_value).0
}

fn hash_with_request_id(raw_value: U256, request_id: U256) -> U256 {
    hash_pair(&request_id.to_big_endian(), raw_value)
}

fn most_normalized(raw_value: U256, request_id: U256, history: &dyn BlockHistory) -> U256 {
    let offset = request_id.low_u64() % BLOCK_HASH_WINDOW;
    // An index before genesis has no fingerprint either.
    let fingerprint = match history.current_index().checked_sub(offset) {
        Some(index) => history.block_hash(index),
        None => ZERO_HASH,
    };
    hash_pair(&fingerprint, raw_value)
}

fn hash_pair(prefix: &[u8; 32], raw_value: U256) -> U256 {
    let mut hasher = Sha256::new();
    hasher.update(prefix);
    hasher.update(raw_value.to_big_endian());
    U256::from_big_endian(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_history::{NoHistory, RecentBlocks};

    #[test]
    fn hyper_efficient_adds_request_id() {
        let out = NormalizationMethod::HyperEfficient.normalize(
            U256::from(12345u64),
            U256::from(1u64),
            &NoHistory,
        );
        assert_eq!(out, U256::from(12346u64));
    }

    #[test]
    fn hyper_efficient_wraps() {
        let out = NormalizationMethod::HyperEfficient.normalize(
            U256::MAX,
            U256::from(2u64),
            &NoHistory,
        );
        assert_eq!(out, U256::one());
    }

    #[test]
    fn hash_with_request_id_matches_manual_digest() {
        let raw = U256::from(99u64);
        let id = U256::from(7u64);

        let mut hasher = Sha256::new();
        hasher.update(id.to_big_endian());
        hasher.update(raw.to_big_endian());
        let expected = U256::from_big_endian(&hasher.finalize());

        assert_eq!(
            NormalizationMethod::HashWithRequestId.normalize(raw, id, &NoHistory),
            expected
        );
    }

    #[test]
    fn most_normalized_uses_block_offset_by_request_id() {
        let history = RecentBlocks::new(0);
        for _ in 0..500 {
            history.seal_next();
        }
        let raw = U256::from(5u64);
        // 3 and 259 select the same block.
        let a = NormalizationMethod::MostNormalized.normalize(raw, U256::from(3u64), &history);
        let b = NormalizationMethod::MostNormalized.normalize(raw, U256::from(259u64), &history);
        let c = NormalizationMethod::MostNormalized.normalize(raw, U256::from(4u64), &history);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn most_normalized_degrades_to_zero_fingerprint() {
        let raw = U256::from(5u64);
        let expected = hash_pair(&ZERO_HASH, raw);

        // Offset 0 selects the current block, which is never visible.
        let history = RecentBlocks::new(0);
        for _ in 0..10 {
            history.seal_next();
        }
        assert_eq!(
            NormalizationMethod::MostNormalized.normalize(raw, U256::from(256u64), &history),
            expected
        );
        // Offset larger than the chain height.
        assert_eq!(
            NormalizationMethod::MostNormalized.normalize(raw, U256::from(200u64), &history),
            expected
        );
        assert_eq!(
            NormalizationMethod::MostNormalized.normalize(raw, U256::from(1u64), &NoHistory),
            expected
        );
    }

    #[test]
    fn out_of_range_method_is_rejected() {
        assert_eq!(
            NormalizationMethod::try_from(3),
            Err(CoordinatorError::InvalidNormalizationMethod(3))
        );
        assert_eq!(
            NormalizationMethod::try_from(2),
            Ok(NormalizationMethod::MostNormalized)
        );
        for method in NormalizationMethod::ALL {
            assert_eq!(NormalizationMethod::try_from(u8::from(method)), Ok(method));
        }
    }
}
