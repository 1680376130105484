pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::controller::AiController;
use crate::registry::AgentRegistry;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<AiController>,
    pub agents: Arc<AgentRegistry>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/agents", get(handlers::list_agents))
        .route("/sessions", post(handlers::create_session).get(handlers::list_sessions))
        .route(
            "/sessions/:session_id",
            get(handlers::get_session).delete(handlers::close_session),
        )
        .route("/sessions/:session_id/messages", post(handlers::post_message))
        .route("/executions/:plan_id", get(handlers::get_execution))
        .route("/memory/search", get(handlers::search_memory))
        .route("/memory/export", post(handlers::export_memory))
        .route("/system/stats", get(handlers::system_stats))
        .route(
            "/agents/:agent/events",
            post(handlers::emit_event).get(handlers::list_events),
        )
        .route("/agents/:agent/events/stats", get(handlers::event_stats))
        .route("/agents/:agent/events/export", get(handlers::export_events))
        .route("/ws/agents/:agent/events", get(handlers::ws_event_stream))
        .with_state(state)
}
