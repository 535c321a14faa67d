//! souk-worker entry point.
//!
//! Boots the offline worker, runs its install and activate steps, starts the
//! connectivity probe and serves the MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use souk_client::{
    ClientHook, DisplayMode, Effect, FetchClient, FetchConfig, HookEvent, Worker, WorkerEvent, WorkerOutcome,
};
use souk_core::{AppConfig, CacheDb, LocalStore};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;

mod handler;
mod probe;
mod tools;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "Starting souk worker on stdio transport");

    let cache = CacheDb::open(&config.cache_db_path).await.context("opening cache database")?;
    let store = LocalStore::open(&config.store_db_path).await.context("opening local store")?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Arc::new(Worker::new(&config, cache, store, network)?);

    let hook = ClientHook::new().with_storage(worker.clone());
    tokio::spawn(log_effects(hook.subscribe_effects()));

    let probe_target = worker.resolve(&config.probe_path)?;
    let online = probe::ConnectivityProbe::check(worker.network().as_ref(), &probe_target).await;
    hook.handle(HookEvent::Startup { display_mode: DisplayMode::Standalone, online }).await;

    let has_controller = match worker.dispatch(WorkerEvent::Install).await? {
        WorkerOutcome::Installed(report) => report.replaces_controller(),
        _ => false,
    };
    worker.dispatch(WorkerEvent::Activate).await?;
    hook.handle(HookEvent::WorkerInstalled { has_controller }).await;

    let restored = worker.sync().restore_registrations().await?;
    if !restored.is_empty() {
        tracing::info!(count = restored.len(), "pending writes from an earlier run");
        if online {
            for tag in worker.sync().registry().take_pending().await {
                worker.dispatch(WorkerEvent::Sync(tag.to_string())).await?;
            }
        }
    }

    let probe = probe::ConnectivityProbe::new(worker.clone(), hook.clone(), probe_target);
    tokio::spawn(probe.run(config.probe_interval()));

    let handler = handler::WorkerServer::new(worker, hook);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

async fn log_effects(mut effects: broadcast::Receiver<Effect>) {
    loop {
        match effects.recv().await {
            Ok(Effect::Notify(notice)) => tracing::info!(notice = ?notice, "{}", notice.message()),
            Ok(Effect::Reload) => tracing::info!("reloading onto the updated worker"),
            Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "effect log fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}
