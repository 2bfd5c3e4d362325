//! livecastd: live chat relay daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use livecast_api::ApiState;
use livecast_core::config::LivecastConfig;
use livecast_services::{ConnectAttemptLimiter, SessionRegistry, WsFeedConnector};

/// How long open viewer sockets get to close after the registry is cleared.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = LivecastConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = LivecastConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        LivecastConfig::default()
    });
    tracing::info!(
        port = config.http.port,
        throttle_ms = config.relay.throttle_interval_ms,
        upstream = %config.upstream.url_template,
        "livecastd starting"
    );

    // ── Shared state ─────────────────────────────────────────────────────────

    let connector = Arc::new(WsFeedConnector::new(config.upstream.url_template.clone()));
    let registry = SessionRegistry::new(connector, &config.relay);
    let attempts = ConnectAttemptLimiter::from_settings(&config.limits);

    let state = ApiState {
        registry: registry.clone(),
        attempts: attempts.clone(),
        static_dir: config.http.static_dir.clone(),
    };

    // ── Shutdown channel ─────────────────────────────────────────────────────

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let prune_task = {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let every = attempts.window().max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => attempts.prune(tokio::time::Instant::now()),
                    _ = shutdown_rx.recv() => break,
                }
            }
        })
    };

    let mut server_task = {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let http = config.http.clone();
        tokio::spawn(async move {
            livecast_api::serve(state, &http, async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = &mut server_task => {
            registry.shutdown().await;
            return r.context("HTTP server task panicked")?;
        }
    }

    registry.shutdown().await;
    match tokio::time::timeout(DRAIN_TIMEOUT, server_task).await {
        Ok(r) => r.context("HTTP server task panicked")??,
        Err(_) => tracing::warn!("viewer sockets did not drain in time"),
    }
    prune_task.abort();

    Ok(())
}
