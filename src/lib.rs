//! offboardd -- multi-tenant scheduled identity-lifecycle action engine.
//!
//! This crate provides the core library for scheduling identity-lifecycle
//! actions (disable account, strip memberships, wipe devices, ...) against a
//! target user, executing them reliably at the scheduled time with per-action
//! outcome tracking and strict tenant isolation.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod directory;
pub mod engine;
pub mod error;
pub mod model;
pub mod poller;
pub mod store;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::OffboarddConfig;

/// Start the offboardd daemon: HTTP API server plus the background poller.
pub async fn serve(config: OffboarddConfig) -> Result<()> {
    // 1. Initialize storage
    tracing::info!(db_path = %config.storage.db_path, "initializing database");
    let pool = store::open_pool(&config.storage.db_path)?;
    let scheduled = store::ScheduledActionStore::new(pool.clone());
    let audit = store::ExecutionLogStore::new(pool);

    // 2. Directory gateway, token provider, engine
    let gateway = Arc::new(directory::HttpDirectoryGateway::new(&config.directory));
    let tokens = Arc::new(auth::HttpTokenProvider::new(config.auth.clone()));
    let engine = engine::ExecutionEngine::new(gateway);
    let dispatcher = poller::Dispatcher::new(scheduled.clone(), audit.clone(), engine, tokens);

    // 3. Start the poller (background task)
    let background = poller::Poller::new(
        dispatcher.clone(),
        Duration::from_secs(config.poller.tick_interval_sec),
        Duration::from_secs(config.poller.stale_claim_sec),
    );
    tokio::spawn(async move {
        background.run().await;
    });

    // 4. Start the API server
    let state = api::state::AppState {
        store: scheduled,
        audit,
        dispatcher,
    };
    let app = api::router(state);
    let addr: std::net::SocketAddr = config.server.bind.parse()?;

    tracing::info!(%addr, "offboardd listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
