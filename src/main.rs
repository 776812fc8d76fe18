// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Brahma Path API Server
//!
//! Serves the daily-cycle and profile-sync core to the front end, running the
//! periodic unlock check and following remote session changes in the
//! background.

use brahma_path::{
    config::Config,
    db::{MemoryRecords, RecordStore, SupabaseDb},
    services::{IdentityProvider, LocalIdentity, SupabaseAuth},
    store::FileKv,
    time_utils::{Clock, SystemClock},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Brahma Path API");

    // Local key-value substrate
    let kv = Arc::new(FileKv::open(&config.data_dir)?);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Remote backend, or local-only mode
    let (records, identity): (Arc<dyn RecordStore>, Arc<dyn IdentityProvider>) =
        match &config.supabase {
            Some(supabase) => {
                let auth = Arc::new(SupabaseAuth::new(
                    &supabase.url,
                    &supabase.anon_key,
                    kv.clone(),
                    clock.clone(),
                ));
                let db = SupabaseDb::new(&supabase.url, &supabase.anon_key)
                    .with_tokens(auth.clone());
                tracing::info!(url = %supabase.url, "Supabase backend configured");
                (
                    Arc::new(db) as Arc<dyn RecordStore>,
                    auth as Arc<dyn IdentityProvider>,
                )
            }
            None => {
                tracing::warn!("No remote backend configured, running local-only");
                (
                    Arc::new(MemoryRecords::unprovisioned()) as Arc<dyn RecordStore>,
                    Arc::new(LocalIdentity::new()) as Arc<dyn IdentityProvider>,
                )
            }
        };

    let state = Arc::new(AppState::new(
        config.clone(),
        kv,
        records,
        identity,
        clock,
    ));

    // Startup reconciliation before serving anything
    let boot = state.bootstrapper.bootstrap().await?;
    tracing::info!(screen = ?boot.screen, "Initial state ready");

    // Passive recompute; resets are mirrored in the background
    let sync = state.sync.clone();
    let ticker = state.cycle.spawn_ticker(
        Duration::from_secs(config.cycle_tick_secs),
        move |profile| {
            sync.spawn_push(profile);
        },
    );
    let sessions = state.bootstrapper.watch_sessions();

    // Build router
    let app = brahma_path::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ticker.cancel();
    sessions.cancel();
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("brahma_path=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
