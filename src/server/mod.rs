//! HTTP/WebSocket server for the browser extension
//!
//! The extension talks to the relay over `/ws`. The REST and SSE endpoints
//! under `/api` expose what the relay is doing for inspection and let a
//! task be cancelled from outside the extension.

pub mod routes;
pub mod session;
pub mod state;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::planning::GoalPlanner;
use crate::sequencer::TaskSequencer;
use state::AppState;

/// Default port for the server
pub const DEFAULT_PORT: u16 = 8080;

/// Build the router over shared state
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors_enabled = state.config.server.cors_enabled;

    let mut app = Router::new()
        // Extension connection
        .route("/ws", get(routes::ws::relay_websocket))

        // Health
        .route("/api/health", get(routes::health::health_check))

        // Tasks
        .route("/api/tasks", get(routes::tasks::list_tasks))
        .route(
            "/api/tasks/:id",
            get(routes::tasks::get_task).delete(routes::tasks::cancel_task),
        )

        // Real-time events (SSE)
        .route("/api/events", get(routes::events::task_events))

        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Periodically fail tasks that stopped making progress
pub fn spawn_reaper(sequencer: Arc<TaskSequencer>) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs(sequencer.config().reap_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let reaped = sequencer.reap_expired(chrono::Utc::now()).await;
            if !reaped.is_empty() {
                tracing::info!("Reaped {} expired task(s)", reaped.len());
            }
        }
    })
}

/// Start the relay server and run until it fails
pub async fn start_server(config: Config, planner: GoalPlanner) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let state = Arc::new(AppState::new(config, planner));
    let reaper = spawn_reaper(Arc::clone(&state.sequencer));

    tracing::info!(
        "LLM planner: {}",
        if state.llm_planner_enabled() { "enabled" } else { "disabled" }
    );

    let app = create_router(state);

    println!("Starting cortex-relay on http://{}", addr);
    println!("Extension endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let result = axum::serve(listener, app).await;
    reaper.abort();
    result?;

    Ok(())
}
