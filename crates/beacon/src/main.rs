//! Genteel Beacon - synthetic-load beacon
//!
//! Models an imaginary office process with two depleting resources and
//! injects probabilistic delays and failures, producing realistic-looking
//! signals for observability-pipeline testing.

use anyhow::Result;
use beacon_lib::{
    BeaconMetrics, ChanceProvider, ChanceRefresher, PressureActor, PressureActorConfig,
    ReplenishScheduler,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod clerk;
mod config;
mod courier;
mod scribe;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting Genteel Beacon 🚨");

    let config = config::BeaconConfig::load()?;
    info!(name = %config.name, role = ?config.role, node_name = %config.node_name, "Beacon configured");

    let metrics = BeaconMetrics::new();
    let (shutdown_tx, _) = broadcast::channel(1);

    // The pressure engine: one single-writer actor plus the replenisher
    let (actor, pressure) = PressureActor::new(
        PressureActorConfig {
            grease_register_chance: config.grease_register_chance,
            ..PressureActorConfig::default()
        },
        metrics.clone(),
    );
    tokio::spawn(actor.run(shutdown_tx.subscribe()));

    let scheduler = ReplenishScheduler::new(
        pressure.clone(),
        Duration::from_secs(config.replenish_secs),
    );
    tokio::spawn(scheduler.run(shutdown_tx.subscribe()));

    // Chaos chances, optionally refreshed from a remote flag source
    let chances = match &config.chaos_flags_url {
        Some(url) => {
            let (provider, refresher) = ChanceProvider::with_remote(
                url.clone(),
                Duration::from_secs(config.chaos_poll_secs),
            );
            tokio::spawn(refresher.run(shutdown_tx.subscribe()));
            provider
        }
        None => {
            info!("No chaos flag source configured, using built-in chances");
            ChanceProvider::fixed()
        }
    };

    let state = Arc::new(api::AppState::new(
        config.clone(),
        pressure,
        chances,
        metrics,
    ));

    let public_addr = format!("{}:{}", config.app_addr, config.app_port);
    let internal_addr = format!("{}:{}", config.int_addr, config.int_port);
    let public = tokio::spawn(api::serve(public_addr, api::public_router(state.clone())));
    let internal = tokio::spawn(api::serve(internal_addr, api::internal_router(state)));

    tokio::select! {
        result = public => result??,
        result = internal => result??,
        _ = tokio::signal::ctrl_c() => {
            info!("SIGINT received, shutting down");
            let _ = shutdown_tx.send(());
        }
    }

    Ok(())
}
