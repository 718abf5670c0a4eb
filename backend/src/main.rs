//! VRNG Oracle Backend
//!
//! Hosts a dice game that composes the VRNG coordinator, and acts as the
//! coordinator's bound randomness provider. Runs three concurrent subsystems:
//!
//! - **Block producer**: seals simulated blocks into the recent-block history.
//! - **Fulfiller**: consumes accepted requests and delivers raw randomness.
//! - **HTTP server**: probes (`/health`, `/status`, `/metrics`) and the
//!   dice API (`POST /rolls`, `GET /rolls/{request_id}`), and the event
//!   feed (`GET /events`, which drains the game and coordinator logs).

use actix_web::{App, HttpResponse, HttpServer, web};
use anyhow::{Context, Result};
use roll_dice::{DiceGame, RollDiceError};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use vrng_consumer::{Address, BlockHistory, CoordinatorError, RecentBlocks, U256};

mod blocks;
mod config;
mod fulfiller;
mod metrics;
mod provider;
mod vrf;

use config::AppConfig;
use fulfiller::SharedGame;
use metrics::Metrics;
use provider::HmacProvider;

/// Shared application state accessible from HTTP handlers.
struct AppState {
    game: SharedGame,
    history: Arc<RecentBlocks>,
    /// Number of fulfillments currently in-flight.
    pending_count: Arc<AtomicU64>,
    metrics: Arc<Metrics>,
}

#[derive(Debug, Deserialize)]
struct RollBody {
    player: Address,
}

/// Liveness probe: returns 200 if the process is running.
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

/// Readiness / status probe.
async fn status(data: web::Data<AppState>) -> HttpResponse {
    let game = data.game.lock().await;
    HttpResponse::Ok().json(serde_json::json!({
        "status": "running",
        "provider": game.provider(),
        "admin": game.admin(),
        "normalization_method": game.normalization_method(),
        "block": data.history.current_index(),
        "pending_requests": game.pending_rolls(),
        "pending_fulfillments": data.pending_count.load(Ordering::Relaxed),
    }))
}

async fn metrics(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.metrics.to_json())
}

/// Drain and return buffered events, oldest first.
async fn events(data: web::Data<AppState>) -> HttpResponse {
    let mut game = data.game.lock().await;
    HttpResponse::Ok().json(serde_json::json!({
        "vrng": game.take_vrng_events(),
        "dice": game.take_events(),
    }))
}

async fn request_roll(data: web::Data<AppState>, body: web::Json<RollBody>) -> HttpResponse {
    let result = data.game.lock().await.request_roll(body.player);
    match result {
        Ok(request_id) => HttpResponse::Ok().json(serde_json::json!({
            "request_id": request_id.to_string(),
        })),
        Err(e @ RollDiceError::Vrng(CoordinatorError::NotInitialized))
        | Err(e @ RollDiceError::Vrng(CoordinatorError::ProviderRejected(_))) => {
            HttpResponse::ServiceUnavailable().json(serde_json::json!({"error": e.to_string()}))
        }
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

async fn get_roll(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let Ok(request_id) = U256::from_dec_str(&path) else {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": "invalid request id"}));
    };
    match data.game.lock().await.roll(request_id) {
        Some(roll) => HttpResponse::Ok().json(roll),
        None => HttpResponse::NotFound().json(serde_json::json!({"error": "roll not found"})),
    }
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/status", web::get().to(status))
        .route("/metrics", web::get().to(metrics))
        .route("/events", web::get().to(events))
        .route("/rolls", web::post().to(request_roll))
        .route("/rolls/{request_id}", web::get().to(get_roll));
}

/// Assemble the game with the HMAC provider bound, returning the receiver
/// the fulfiller drains.
fn build_game(
    config: &AppConfig,
    history: Arc<RecentBlocks>,
    metrics: Arc<Metrics>,
) -> Result<(SharedGame, mpsc::Receiver<provider::PendingRequest>)> {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let provider = HmacProvider::new(config.provider_address, history.clone(), tx, metrics);

    let mut game = DiceGame::with_method(config.admin_address, config.normalization_method, history);
    game.set_event_capacity(Some(config.event_capacity));
    game.set_provider(config.admin_address, Some(Arc::new(provider)))?;

    Ok((Arc::new(Mutex::new(game)), rx))
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,actix_server=warn")),
        )
        .with_target(true)
        .with_ansi(true)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    info!(
        provider = %config.provider_address,
        admin = %config.admin_address,
        method = ?config.normalization_method,
        "Starting VRNG backend"
    );

    let metrics = Arc::new(Metrics::new());
    let history = Arc::new(RecentBlocks::new(0));
    let pending_count = Arc::new(AtomicU64::new(0));
    let (game, rx) = build_game(&config, history.clone(), metrics.clone())?;

    // Background: advance the simulated chain.
    tokio::spawn(blocks::run_block_producer(
        history.clone(),
        config.block_interval,
        metrics.clone(),
    ));

    // Background: consume accepted requests and fulfill them.
    tokio::spawn(fulfiller::run_fulfiller(
        config.clone(),
        rx,
        game.clone(),
        pending_count.clone(),
        metrics.clone(),
    ));

    let state = web::Data::new(AppState {
        game,
        history,
        pending_count,
        metrics,
    });

    info!(port = config.http_port, "Starting HTTP server");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(("0.0.0.0", config.http_port))?
        .run()
        .await?;

    Ok(())
}
