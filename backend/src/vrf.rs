//! Deterministic raw randomness computation.
//!
//! Uses HMAC-SHA256 keyed by the oracle's secret to produce a 256-bit
//! pseudo-random value that is deterministic (same inputs = same output)
//! but unpredictable without the secret key.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use vrng_consumer::U256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the raw provider value for a randomness request.
///
/// ```text
/// output = HMAC-SHA256(secret, trace_id_be || request_block_le || request_id_be)
/// ```
///
/// The `request_block` binds the output to the simulated chain height at
/// request time, and `request_id` ensures uniqueness across requests.
pub fn compute_randomness(
    hmac_secret: &[u8],
    trace_id: U256,
    request_block: u64,
    request_id: U256,
) -> U256 {
    let mut mac =
        HmacSha256::new_from_slice(hmac_secret).expect("HMAC accepts keys of any size");

    mac.update(&trace_id.to_big_endian());
    mac.update(&request_block.to_le_bytes());
    mac.update(&request_id.to_big_endian());

    let bytes = mac.finalize().into_bytes();
    U256::from_big_endian(&bytes)
}
