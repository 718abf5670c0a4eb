//! Application configuration loaded from environment variables.
//!
//! Required: `HMAC_SECRET`
//! Optional: `PROVIDER_ADDRESS`, `ADMIN_ADDRESS`, `NORMALIZATION_METHOD`,
//!           `HTTP_PORT`, `BLOCK_INTERVAL_MS`, `FULFILLMENT_DELAY_MS`,
//!           `FULFILLMENT_CONCURRENCY`, `CHANNEL_CAPACITY`, `EVENT_CAPACITY`

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use vrng_consumer::{Address, NormalizationMethod};

/// Application configuration for the VRNG oracle backend.
#[derive(Clone)]
pub struct AppConfig {
    /// Secret key for HMAC-SHA256 randomness generation.
    pub hmac_secret: Vec<u8>,
    /// Identity the provider uses when fulfilling requests.
    pub provider_address: Address,
    /// Admin of the hosted dice game (allowed to rebind the provider).
    pub admin_address: Address,
    /// Normalization strategy for the hosted coordinator.
    pub normalization_method: NormalizationMethod,
    /// HTTP server port.
    pub http_port: u16,
    /// Interval between simulated blocks.
    pub block_interval: Duration,
    /// Artificial delay before each fulfillment.
    pub fulfillment_delay: Duration,
    /// Maximum concurrent fulfillment tasks.
    pub fulfillment_concurrency: usize,
    /// Capacity of the pending-request queue.
    pub channel_capacity: usize,
    /// Events retained between `/events` drains; older ones are dropped.
    pub event_capacity: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Load configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let var = |key: &str| vars.get(key).map(String::as_str);

        let hmac_secret = var("HMAC_SECRET")
            .context("HMAC_SECRET env var must be set")?
            .as_bytes()
            .to_vec();

        let provider_address = match var("PROVIDER_ADDRESS") {
            Some(s) => Address::from_str(s)
                .with_context(|| format!("invalid PROVIDER_ADDRESS: {s}"))?,
            None => derive_address(b"provider", &hmac_secret),
        };

        let admin_address = match var("ADMIN_ADDRESS") {
            Some(s) => {
                Address::from_str(s).with_context(|| format!("invalid ADMIN_ADDRESS: {s}"))?
            }
            None => derive_address(b"admin", &hmac_secret),
        };

        let normalization_method = match var("NORMALIZATION_METHOD") {
            Some(s) => {
                let raw: u8 = s
                    .parse()
                    .with_context(|| format!("invalid NORMALIZATION_METHOD: {s}"))?;
                NormalizationMethod::try_from(raw)?
            }
            None => NormalizationMethod::default(),
        };

        let parsed = |key: &str| var(key).and_then(|v| v.parse::<u64>().ok());

        let http_port = var("HTTP_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let block_interval = Duration::from_millis(parsed("BLOCK_INTERVAL_MS").unwrap_or(400));
        let fulfillment_delay = Duration::from_millis(parsed("FULFILLMENT_DELAY_MS").unwrap_or(0));

        let fulfillment_concurrency = var("FULFILLMENT_CONCURRENCY")
            .and_then(|v| v.parse().ok())
            .unwrap_or(4);

        let channel_capacity = var("CHANNEL_CAPACITY")
            .and_then(|v| v.parse().ok())
            .unwrap_or(256);

        let event_capacity = var("EVENT_CAPACITY")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1024);

        Ok(Self {
            hmac_secret,
            provider_address,
            admin_address,
            normalization_method,
            http_port,
            block_interval,
            fulfillment_delay,
            fulfillment_concurrency,
            channel_capacity,
            event_capacity,
        })
    }
}

/// `sha256(label || secret)` as an address, so a bare secret yields stable identities.
fn derive_address(label: &[u8], secret: &[u8]) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(label);
    hasher.update(secret);
    Address::new(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn secret_is_required() {
        assert!(AppConfig::from_vars(&vars(&[])).is_err());
    }

    #[test]
    fn defaults() {
        let config = AppConfig::from_vars(&vars(&[("HMAC_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.hmac_secret, b"s3cret");
        assert_eq!(config.normalization_method, NormalizationMethod::HyperEfficient);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.block_interval, Duration::from_millis(400));
        assert_eq!(config.fulfillment_delay, Duration::ZERO);
        assert_eq!(config.fulfillment_concurrency, 4);
        assert_eq!(config.channel_capacity, 256);
        assert_eq!(config.event_capacity, 1024);
        assert_ne!(config.provider_address, config.admin_address);
    }

    #[test]
    fn explicit_values() {
        let provider = "11".repeat(32);
        let config = AppConfig::from_vars(&vars(&[
            ("HMAC_SECRET", "s"),
            ("PROVIDER_ADDRESS", &provider),
            ("NORMALIZATION_METHOD", "2"),
            ("HTTP_PORT", "9000"),
            ("FULFILLMENT_DELAY_MS", "25"),
        ]))
        .unwrap();
        assert_eq!(config.provider_address, Address::new([0x11; 32]));
        assert_eq!(config.normalization_method, NormalizationMethod::MostNormalized);
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.fulfillment_delay, Duration::from_millis(25));
    }

    #[test]
    fn out_of_range_method_is_rejected() {
        let err = AppConfig::from_vars(&vars(&[("HMAC_SECRET", "s"), ("NORMALIZATION_METHOD", "3")]))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("Invalid normalization method"));
    }

    #[test]
    fn bad_address_is_rejected() {
        assert!(
            AppConfig::from_vars(&vars(&[("HMAC_SECRET", "s"), ("ADMIN_ADDRESS", "zz")])).is_err()
        );
    }
}
