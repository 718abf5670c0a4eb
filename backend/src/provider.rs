//! In-process randomness provider.
//!
//! Accepts requests synchronously from the hosted coordinator, assigns ids
//! from a monotonically increasing counter, and queues each accepted request
//! for the fulfiller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info};
use vrng_consumer::{Address, BlockHistory, ProviderError, RandomnessProvider, U256};

use crate::metrics::Metrics;

/// A request accepted by the provider and awaiting fulfillment.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request_id: U256,
    pub trace_id: U256,
    /// Simulated block height at acceptance time.
    pub request_block: u64,
    pub accepted_at: Instant,
}

/// HMAC oracle provider.
pub struct HmacProvider {
    address: Address,
    /// Next request id to hand out. Starts at 1.
    request_counter: AtomicU64,
    history: Arc<dyn BlockHistory>,
    queue: mpsc::Sender<PendingRequest>,
    metrics: Arc<Metrics>,
}

impl HmacProvider {
    pub fn new(
        address: Address,
        history: Arc<dyn BlockHistory>,
        queue: mpsc::Sender<PendingRequest>,
        metrics: Arc<Metrics>,
    ) -> Self {
        HmacProvider {
            address,
            request_counter: AtomicU64::new(1),
            history,
            queue,
            metrics,
        }
    }

    fn next_request_id(&self) -> Result<u64, ProviderError> {
        self.request_counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map_err(|_| ProviderError::CounterOverflow)
    }
}

impl RandomnessProvider for HmacProvider {
    fn address(&self) -> Address {
        self.address
    }

    fn request_random_number(&self, trace_id: U256) -> Result<U256, ProviderError> {
        // Reserve a queue slot first so a full queue never burns an id.
        let permit = self.queue.try_reserve().map_err(|e| {
            error!(error = %e, "Fulfillment queue unavailable");
            ProviderError::Unavailable
        })?;

        let request_id = U256::from(self.next_request_id()?);
        let request_block = self.history.current_index();

        permit.send(PendingRequest {
            request_id,
            trace_id,
            request_block,
            accepted_at: Instant::now(),
        });
        self.metrics.record_request();

        info!(%request_id, %trace_id, block = request_block, "Accepted randomness request");
        Ok(request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrng_consumer::RecentBlocks;

    fn provider(capacity: usize) -> (HmacProvider, mpsc::Receiver<PendingRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        let history = Arc::new(RecentBlocks::new(10));
        let provider = HmacProvider::new(Address::new([3u8; 32]), history, tx, Arc::new(Metrics::new()));
        (provider, rx)
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let (provider, mut rx) = provider(8);
        assert_eq!(provider.request_random_number(U256::from(5u64)), Ok(U256::one()));
        assert_eq!(provider.request_random_number(U256::zero()), Ok(U256::from(2u64)));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.request_id, U256::one());
        assert_eq!(first.trace_id, U256::from(5u64));
        assert_eq!(first.request_block, 10);
        assert_eq!(rx.try_recv().unwrap().request_id, U256::from(2u64));
    }

    #[test]
    fn full_queue_is_unavailable() {
        let (provider, _rx) = provider(1);
        provider.request_random_number(U256::zero()).unwrap();
        assert_eq!(
            provider.request_random_number(U256::zero()),
            Err(ProviderError::Unavailable)
        );
        // The refused request did not consume an id.
        assert_eq!(provider.request_counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn closed_queue_is_unavailable() {
        let (provider, rx) = provider(4);
        drop(rx);
        assert_eq!(
            provider.request_random_number(U256::zero()),
            Err(ProviderError::Unavailable)
        );
    }

    #[test]
    fn counter_overflow_is_reported() {
        let (provider, _rx) = provider(4);
        provider.request_counter.store(u64::MAX, Ordering::SeqCst);
        assert_eq!(
            provider.request_random_number(U256::zero()),
            Err(ProviderError::CounterOverflow)
        );
    }
}
