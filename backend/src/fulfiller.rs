//! Fulfillment engine: consumes accepted requests and delivers raw
//! randomness back to the hosted coordinator as the bound provider.

use roll_dice::{DiceGame, RollDiceError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tracing::{error, info, instrument, warn};
use vrng_consumer::{CoordinatorError, U256};

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::provider::PendingRequest;
use crate::vrf::compute_randomness;

/// Dice game shared between the HTTP handlers and the fulfiller.
pub type SharedGame = Arc<Mutex<DiceGame>>;

/// Coordinator rejections that will never succeed on retry.
fn is_non_retryable(err: &RollDiceError) -> bool {
    matches!(
        err,
        RollDiceError::Vrng(CoordinatorError::InvalidFulfillment | CoordinatorError::OnlyProvider)
    )
}

/// Main fulfiller loop.
pub async fn run_fulfiller(
    config: AppConfig,
    mut rx: mpsc::Receiver<PendingRequest>,
    game: SharedGame,
    pending_count: Arc<AtomicU64>,
    metrics: Arc<Metrics>,
) {
    let semaphore = Arc::new(Semaphore::new(config.fulfillment_concurrency.max(1)));

    while let Some(request) = rx.recv().await {
        pending_count.fetch_add(1, Ordering::Relaxed);

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                error!("Semaphore closed, stopping fulfiller");
                break;
            }
        };
        let cfg = config.clone();
        let game = game.clone();
        let pending = pending_count.clone();
        let met = metrics.clone();

        tokio::spawn(async move {
            let _permit = permit;

            info!(
                request_id = %request.request_id,
                trace_id = %request.trace_id,
                block = request.request_block,
                "Fulfilling randomness request"
            );

            match fulfill_request(&cfg, &game, &request).await {
                Ok(()) => {
                    let latency_ms = request.accepted_at.elapsed().as_millis() as u64;
                    met.record_fulfillment(latency_ms);
                    info!(request_id = %request.request_id, latency_ms, "Fulfilled successfully");
                }
                Err(e) => handle_fulfillment_error(request.request_id, e, &met),
            }

            pending.fetch_sub(1, Ordering::Relaxed);
        });
    }

    info!("Fulfiller channel closed, shutting down");
}

fn handle_fulfillment_error(request_id: U256, error: RollDiceError, metrics: &Metrics) {
    if is_non_retryable(&error) {
        metrics.record_skip();
        warn!(
            %request_id,
            reason = %error,
            "Skipping request (non-retryable)"
        );
    } else {
        metrics.record_failure();
        error!(
            %request_id,
            error = %error,
            "Failed to fulfill"
        );
    }
}

/// Compute the raw value and deliver it to the coordinator.
#[instrument(skip_all, fields(request_id = %request.request_id))]
pub async fn fulfill_request(
    config: &AppConfig,
    game: &SharedGame,
    request: &PendingRequest,
) -> Result<(), RollDiceError> {
    if !config.fulfillment_delay.is_zero() {
        tokio::time::sleep(config.fulfillment_delay).await;
    }

    let raw_value = compute_randomness(
        &config.hmac_secret,
        request.trace_id,
        request.request_block,
        request.request_id,
    );

    game.lock()
        .await
        .fulfill_randomness(config.provider_address, request.request_id, raw_value)
}
