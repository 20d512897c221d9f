//! route-shaper gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ listener ──▶ request id ──▶ trace ──▶ route_metrics ──▶ forward ──▶ Upstream
//!                                                          │
//!                                                          ▼
//!                                                ┌──────────────────┐
//!                                                │  PathNormalizer  │◀── admin (stats, shape)
//!                                                │  trie + LRU      │
//!                                                └──────────────────┘
//!                                                          │
//!                                                          ▼
//!                                          metrics labeled by route template
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use route_shaper::admin;
use route_shaper::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use route_shaper::lifecycle::{signals, Shutdown};
use route_shaper::observability::{logging, metrics};
use route_shaper::{HttpServer, PathNormalizer};

#[derive(Parser)]
#[command(name = "route-shaper")]
#[command(about = "Gateway that labels metrics by learned route templates", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("route-shaper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = ?config.upstream.address,
        max_cache_size = config.normalizer.max_cache_size,
        promotion_threshold = config.normalizer.promotion_threshold,
        max_trie_nodes = ?config.normalizer.max_trie_nodes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let normalizer = Arc::new(PathNormalizer::new(&config.normalizer));
    let shutdown = Shutdown::new();

    // Keep the watcher handle alive for the lifetime of the process.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config.clone(), normalizer);

    let admin_task = if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = server.state();
        let signal = shutdown.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = admin::serve_admin(admin_listener, state, signal).await {
                tracing::error!(error = %e, "Admin endpoint failed");
            }
        }))
    } else {
        None
    };

    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    signals::wait_for_signal().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();

    server_task.await??;
    if let Some(task) = admin_task {
        task.await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
