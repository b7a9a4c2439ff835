//! Genteel Beacon - gearsmith
//!
//! Discovers the beacons running in its own namespace, scrapes their gauges,
//! aggregates them per beacon and serves the results as a custom-metrics API
//! for the HorizontalPodAutoscaler.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod discovery;
mod poller;
mod scraper;

use discovery::{KubeDiscovery, PeerLister};
use poller::{GearPoller, PollerConfig};
use scraper::{GaugeSource, HttpScraper};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting Grumpy Gearsmith ⚙️");

    let config = config::GearsmithConfig::load()?;

    let namespace = discovery::read_namespace(&config.namespace_file)
        .context("gearsmith must run inside the target cluster")?;
    info!(namespace = %namespace, "Running in namespace");

    let lister: Arc<dyn PeerLister> = Arc::new(KubeDiscovery::connect(&namespace).await?);
    let source: Arc<dyn GaugeSource> = Arc::new(HttpScraper::new(
        config.scrape_port,
        config.scrape_timeout(),
    )?);

    let (shutdown_tx, _) = broadcast::channel(1);

    let (poller, snapshots) = GearPoller::new(
        lister,
        source,
        PollerConfig {
            period: config.poll_period(),
            empty_cycle_policy: config.empty_cycle_policy,
        },
    );
    tokio::spawn(poller.run(shutdown_tx.subscribe()));

    let state = Arc::new(api::GearState {
        namespace,
        snapshots,
    });
    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.bind_port)
        .parse()
        .context("invalid bind address")?;

    let server = tokio::spawn(api::serve_tls(
        addr,
        config.tls_cert.clone(),
        config.tls_key.clone(),
        api::router(state),
    ));

    tokio::select! {
        result = server => result??,
        _ = tokio::signal::ctrl_c() => {
            info!("SIGINT received, shutting down");
            let _ = shutdown_tx.send(());
        }
    }

    Ok(())
}
