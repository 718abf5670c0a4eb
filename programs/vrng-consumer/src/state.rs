use std::fmt;
use std::str::FromStr;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// 32-byte account identity used to authenticate providers and callers.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(#[serde(with = "hex::serde")] pub [u8; 32]);

impl Address {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Address(bytes))
    }
}

/// Request lifecycle status.
///
/// Transitions only move forward: `None -> Requested -> Fulfilled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Never seen by this coordinator.
    #[default]
    None,
    /// Accepted by the provider, awaiting fulfillment.
    Requested,
    /// Fulfilled and normalized. Terminal.
    Fulfilled,
}

/// Snapshot of one randomness request.
///
/// Unseen request ids read back as `Request::default()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Request lifecycle status.
    pub status: RequestStatus,
    /// Normalized output. Zero until the request is fulfilled.
    pub normalized_value: U256,
}

impl Request {
    pub(crate) fn requested() -> Self {
        Request {
            status: RequestStatus::Requested,
            normalized_value: U256::zero(),
        }
    }

    pub(crate) fn fulfilled(normalized_value: U256) -> Self {
        Request {
            status: RequestStatus::Fulfilled,
            normalized_value,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.status == RequestStatus::Fulfilled
    }
}
