// [[KERNEL]]/apps/agent-kernel/src/main.rs
// Purpose: Entry point. Loads memory from disk before starting the server.
// Architecture: Application Boot
// Dependencies: Axum, Tower, Tokio

mod config;
mod controller;
mod dag;
mod events;
mod executor;
mod inference;
mod memory;
mod models;
mod observability;
mod planner;
mod registry;
mod security;
mod server;
mod storage;

use anyhow::Context;
use axum::http::Method;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::KernelConfig;
use crate::controller::AiController;
use crate::inference::{ModelBackend, ModelRegistry};
use crate::memory::MemoryManager;
use crate::registry::{AgentRegistry, KNOWN_MODELS};
use crate::server::AppState;
use crate::storage::JsonStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agent_kernel=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    tracing::info!("Initializing Agent Kernel...");

    let config = KernelConfig::from_env();
    let retention_hours = config.memory.max_session_age_hours;

    // === MEMORY RECOVERY ===
    // Knowledge and context written by previous runs are loaded before any request is served.
    let store = JsonStore::new(&config.storage_path);
    let memory = MemoryManager::open(store, config.memory)
        .await
        .with_context(|| format!("failed to open memory at {}", config.storage_path.display()))?;
    let memory = Arc::new(memory);

    let backend = ModelBackend::parse(&config.model_backend)?;
    let models = ModelRegistry::from_backend(
        backend,
        KNOWN_MODELS,
        &config.ollama_base_url,
        config.executor.task_timeout,
    )?;
    tracing::info!("Model backend {:?} with {} models", backend, models.len());

    let controller = Arc::new(AiController::new(config.executor, memory, models));
    let agents = Arc::new(AgentRegistry::new(config.event_history_size));

    let shutdown = CancellationToken::new();
    let cleanup = tokio::spawn(run_cleanup(
        controller.clone(),
        agents.clone(),
        retention_hours,
        config.cleanup_interval,
        shutdown.clone(),
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let app = server::router(AppState { controller, agents })
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Agent Kernel listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("server error")?;

    shutdown.cancel();
    cleanup.await.context("cleanup task panicked")?;
    tracing::info!("Agent Kernel stopped");
    Ok(())
}

async fn run_cleanup(
    controller: Arc<AiController>,
    agents: Arc<AgentRegistry>,
    retention_hours: i64,
    every: std::time::Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    // The first tick fires immediately; nothing to clean at boot.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let idle = controller.close_idle_sessions(retention_hours).await;
                if idle > 0 {
                    tracing::info!("Closed {} idle sessions", idle);
                }

                match controller.memory().cleanup_memory().await {
                    Ok(report) => tracing::info!(
                        "Memory cleanup: {} expired, {} overflow, {} retained",
                        report.expired_sessions,
                        report.overflow_sessions,
                        report.retained_sessions
                    ),
                    Err(e) => tracing::error!("Memory cleanup failed: {}", e),
                }

                let dropped = agents.clear_old_events(retention_hours);
                if dropped > 0 {
                    tracing::info!("Dropped {} events older than {}h", dropped, retention_hours);
                }
            }
        }
    }
}
