// [[KERNEL]]/apps/agent-kernel/src/server/handlers.rs
// Purpose: API Handlers. Thin mapping from HTTP onto the controller and event logs.
// Architecture: API Layer
// Dependencies: Axum, Controller, Events

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Json, Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::AppState;
use crate::controller::{ControllerError, SystemStats};
use crate::events::{EventError, EventFilter, EventManager, EventPriority, EventType, DEFAULT_EVENT_LIMIT};
use crate::memory::MemoryKind;
use crate::models::{AgentResponse, Execution, MessageRole, ResponseStatus, Session};
use crate::registry;
use crate::security::ClientId;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    message: String,
}

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    agent_type: String,
    #[serde(default)]
    context: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct SessionQuery {
    user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct MessageRequest {
    message: String,
    #[serde(default)]
    attachments: Vec<Value>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: String,
    types: Option<String>,
    max: Option<usize>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ExportMemoryRequest {
    #[serde(default = "default_true")]
    include_sessions: bool,
    #[serde(default = "default_true")]
    include_knowledge: bool,
}

#[derive(Deserialize)]
pub struct EmitEventRequest {
    event_type: EventType,
    session_id: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    priority: EventPriority,
}

#[derive(Deserialize)]
pub struct EventQuery {
    session_id: Option<String>,
    event_type: Option<String>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    session_id: Option<String>,
    format: Option<String>,
}

fn controller_status(e: ControllerError) -> StatusCode {
    match e {
        ControllerError::SessionNotFound(id) => {
            tracing::debug!("Session not found: {}", id);
            StatusCode::NOT_FOUND
        }
        ControllerError::Memory(e) => {
            tracing::error!("Memory operation failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn agent_events(state: &AppState, agent: &str) -> Result<Arc<EventManager>, StatusCode> {
    state.agents.event_manager(agent).map_err(|e| {
        tracing::warn!("{}", e);
        StatusCode::NOT_FOUND
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Agent Kernel is running".to_string(),
    })
}

pub async fn list_agents(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "profiles": registry::profiles(),
        "event_agents": state.agents.agents(),
    }))
}

pub async fn create_session(
    State(state): State<AppState>,
    ClientId(user_id): ClientId,
    Json(request): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let session_id = state
        .controller
        .create_session(&request.agent_type, user_id.as_deref(), request.context);

    if let Ok(events) = state.agents.event_manager(&request.agent_type) {
        events.emit_consultation_started(&session_id, &request.agent_type, json!({ "user_id": user_id }));
    }

    (StatusCode::CREATED, Json(json!({ "session_id": session_id })))
}

pub async fn list_sessions(State(state): State<AppState>, Query(query): Query<SessionQuery>) -> Json<Vec<Session>> {
    Json(state.controller.list_sessions(query.user_id.as_deref()).await)
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let session = state
        .controller
        .get_session(&session_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(json!({
        "session": session,
        "context": state.controller.memory().get_session_context_values(&session_id),
    })))
}

pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, StatusCode> {
    let session = state
        .controller
        .close_session(&session_id)
        .await
        .map_err(controller_status)?;

    if let Ok(events) = state.agents.event_manager(&session.agent_type) {
        let ended = session.closed_at.unwrap_or_else(Utc::now);
        let duration = (ended - session.created_at).num_milliseconds() as f64 / 1000.0;
        events.emit_consultation_completed(&session_id, duration, &delivered_plans(&session), None);
    }

    Ok(Json(session))
}

pub async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<AgentResponse>, StatusCode> {
    let agent_type = state
        .controller
        .get_session(&session_id)
        .await
        .map(|s| s.agent_type)
        .ok_or(StatusCode::NOT_FOUND)?;

    let response = state
        .controller
        .process_message(&session_id, &request.message, request.attachments)
        .await
        .map_err(controller_status)?;

    if let Ok(events) = state.agents.event_manager(&agent_type) {
        let meta = &response.metadata;
        events.emit_event(
            EventType::RequestProcessed,
            &session_id,
            json!({
                "plan_id": meta.plan_id,
                "status": meta.status,
                "completed_tasks": meta.completed_tasks,
                "failed_tasks": meta.failed_tasks,
                "execution_time": meta.execution_time,
            }),
            json!({ "request_id": meta.request_id }),
            EventPriority::Low,
        );

        if agent_type == "strategist" && meta.status != ResponseStatus::Error {
            let complexity = match meta.total_tasks {
                0..=1 => "low",
                2..=3 => "medium",
                _ => "high",
            };
            events.emit_strategy_generated(&session_id, "consultation_response", &meta.models_used, complexity);
        }

        if meta.status == ResponseStatus::Error {
            events.emit_error_occurred(
                &session_id,
                "plan_execution",
                meta.error.as_deref().unwrap_or("unknown error"),
                "high",
            );
        }
    }

    Ok(Json(response))
}

/// Plan ids recorded on the assistant turns of a session.
fn delivered_plans(session: &Session) -> Vec<String> {
    session
        .messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .filter_map(|m| m.metadata.as_ref()?.get("plan_id")?.as_str().map(str::to_string))
        .collect()
}

pub async fn get_execution(
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Json<Execution>, StatusCode> {
    state
        .controller
        .execution_status(&plan_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn search_memory(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, StatusCode> {
    let kinds = match query.types.as_deref() {
        Some(raw) => raw
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<MemoryKind>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                tracing::warn!("Rejected memory search: {}", e);
                StatusCode::BAD_REQUEST
            })?,
        None => Vec::new(),
    };

    let results = state
        .controller
        .memory()
        .search_memory(&query.q, &kinds, query.max.unwrap_or(10))
        .await;

    Ok(Json(json!({ "query": query.q, "results": results })))
}

pub async fn export_memory(
    State(state): State<AppState>,
    Json(request): Json<ExportMemoryRequest>,
) -> Result<Json<Value>, StatusCode> {
    let memory = state.controller.memory();
    let path = memory.default_export_path();

    memory
        .export_memory(&path, request.include_sessions, request.include_knowledge)
        .await
        .map_err(|e| {
            tracing::error!("Memory export failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(json!({ "export_path": path.display().to_string() })))
}

pub async fn system_stats(State(state): State<AppState>) -> Json<SystemStats> {
    Json(state.controller.system_stats().await)
}

pub async fn emit_event(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    Json(request): Json<EmitEventRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let events = agent_events(&state, &agent)?;
    let event_id = events.emit_event(
        request.event_type,
        &request.session_id,
        request.data,
        request.metadata,
        request.priority,
    );

    Ok((StatusCode::CREATED, Json(json!({ "event_id": event_id }))))
}

pub async fn list_events(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Value>, StatusCode> {
    let events = agent_events(&state, &agent)?;
    let event_type = query
        .event_type
        .as_deref()
        .map(str::parse::<EventType>)
        .transpose()
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let filter = EventFilter {
        session_id: query.session_id,
        event_type,
        limit: query.limit.unwrap_or(DEFAULT_EVENT_LIMIT),
    };

    Ok(Json(json!({ "agent": agent, "events": events.get_events(&filter) })))
}

pub async fn event_stats(
    State(state): State<AppState>,
    Path(agent): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let events = agent_events(&state, &agent)?;

    Ok(Json(json!({
        "agent": agent,
        "statistics": events.get_event_statistics(),
        "analytics": events.metrics_summary(),
    })))
}

pub async fn export_events(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let events = agent_events(&state, &agent)?;
    let format = query.format.as_deref().unwrap_or("json");

    let body = events
        .export_events(query.session_id.as_deref(), format)
        .map_err(|e| match e {
            EventError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            other => {
                tracing::error!("Event export failed: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

pub async fn ws_event_stream(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let events = agent_events(&state, &agent)?;
    Ok(ws.on_upgrade(move |socket| handle_event_stream(socket, events, agent)))
}

async fn handle_event_stream(socket: WebSocket, events: Arc<EventManager>, agent: String) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe first so nothing emitted while the snapshot goes out is lost.
    let mut live = events.subscribe();

    let snapshot = json!({
        "type": "history",
        "agent": agent,
        "events": events.get_events(&EventFilter::default()),
    });
    if sender.send(Message::Text(snapshot.to_string())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = receiver.next() => {
                if msg.is_none() {
                    tracing::info!("Client disconnected from event stream: {}", agent);
                    break;
                }
            }

            received = live.recv() => {
                match received {
                    Ok(event) => {
                        let update = json!({ "type": "event", "event": event });
                        if sender.send(Message::Text(update.to_string())).await.is_err() {
                            tracing::info!("Failed to send event, client disconnected");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Event stream for {} lagged, skipped {} events", agent, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}
