//! Simulated block producer.
//!
//! Seals a new block into the shared [`RecentBlocks`] history on a fixed
//! interval, giving the most-normalized strategy a moving recent-block
//! fingerprint outside of a real chain.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::debug;
use vrng_consumer::RecentBlocks;

use crate::metrics::Metrics;

pub async fn run_block_producer(history: Arc<RecentBlocks>, interval: Duration, metrics: Arc<Metrics>) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let sealed = history.seal_next();
        metrics.record_block();
        debug!(block = sealed, "Sealed block");
    }
}
