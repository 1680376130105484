// [[KERNEL]]/apps/agent-kernel/src/controller.rs
// Purpose: Session lifecycle. Plans, executes and records each chat message.
// Architecture: Domain Logic Layer
// Dependencies: dashmap, tokio, Planner, Executor, Memory

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::executor::{ExecutorConfig, TaskExecutor};
use crate::inference::ModelRegistry;
use crate::memory::{MemoryError, MemoryManager, MemoryUsage};
use crate::models::{AgentResponse, Execution, MessageRole, Session, SessionState};
use crate::planner::TaskPlanner;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Session {0} not found")]
    SessionNotFound(String),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub active_sessions: usize,
    pub total_models: usize,
    pub models: Vec<String>,
    pub memory_usage: MemoryUsage,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
}

/// Keeps only characters that are safe inside a session id.
fn id_fragment(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .take(64)
        .collect()
}

fn last_activity(session: &Session) -> DateTime<Utc> {
    session.messages.last().map_or(session.created_at, |m| m.timestamp)
}

pub struct AiController {
    planner: TaskPlanner,
    executor: TaskExecutor,
    memory: Arc<MemoryManager>,
    models: ModelRegistry,
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    started_at: DateTime<Utc>,
}

impl AiController {
    pub fn new(executor_config: ExecutorConfig, memory: Arc<MemoryManager>, models: ModelRegistry) -> Self {
        Self {
            planner: TaskPlanner::new(),
            executor: TaskExecutor::new(executor_config),
            memory,
            models,
            sessions: DashMap::new(),
            started_at: Utc::now(),
        }
    }

    pub fn memory(&self) -> &Arc<MemoryManager> {
        &self.memory
    }

    /// Opens a session and returns its id,
    /// `session_{YYYYmmdd_HHMMSS}_{user|anonymous}` plus a random tag on collision.
    pub fn create_session(&self, agent_type: &str, user_id: Option<&str>, context: Map<String, Value>) -> String {
        let owner = user_id.map(id_fragment).unwrap_or_else(|| "anonymous".to_string());
        let base = format!("session_{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), owner);

        let mut session_id = base.clone();
        loop {
            match self.sessions.entry(session_id.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    let tag = Uuid::new_v4().simple().to_string();
                    session_id = format!("{}_{}", base, &tag[..6]);
                }
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(Arc::new(Mutex::new(Session::new(
                        session_id.clone(),
                        agent_type,
                        user_id.map(str::to_string),
                        context,
                    ))));
                    break;
                }
            }
        }

        tracing::info!("Created session {} for agent {}", session_id, agent_type);
        session_id
    }

    fn session_handle(&self, session_id: &str) -> Result<Arc<Mutex<Session>>, ControllerError> {
        self.sessions
            .get(session_id)
            .map(|s| s.value().clone())
            .ok_or_else(|| ControllerError::SessionNotFound(session_id.to_string()))
    }

    /// Calls for the same session run one at a time.
    pub async fn process_message(
        &self,
        session_id: &str,
        message: &str,
        attachments: Vec<Value>,
    ) -> Result<AgentResponse, ControllerError> {
        let handle = self.session_handle(session_id)?;
        let mut session = handle.lock().await;

        // Closed while this call was waiting on the lock.
        if session.state == SessionState::Closed {
            return Err(ControllerError::SessionNotFound(session_id.to_string()));
        }

        session.append_message(MessageRole::User, message, attachments, None);

        let plan = self
            .planner
            .create_plan(message, &session.agent_type, &session.context, &session.messages);
        let session_context = serde_json::to_value(&*session).unwrap_or_default();

        let response = self.executor.execute_plan(&plan, &self.models, session_context).await;
        let metadata = serde_json::to_value(&response.metadata).unwrap_or_default();

        session.append_message(MessageRole::Assistant, &response.content, Vec::new(), Some(metadata.clone()));

        if let Err(e) = self
            .memory
            .store_interaction(session_id, message, &response.content, metadata)
            .await
        {
            tracing::error!(
                request_id = %response.metadata.request_id,
                "Failed to record interaction for session {}: {}",
                session_id,
                e
            );
        }

        Ok(response)
    }

    pub async fn get_session(&self, session_id: &str) -> Option<Session> {
        let handle = self.session_handle(session_id).ok()?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Active sessions, oldest first, optionally only those of `user_id`.
    pub async fn list_sessions(&self, user_id: Option<&str>) -> Vec<Session> {
        let handles: Vec<Arc<Mutex<Session>>> = self.sessions.iter().map(|s| s.value().clone()).collect();

        let mut sessions = Vec::with_capacity(handles.len());
        for handle in handles {
            let session = handle.lock().await;
            if user_id.map_or(true, |u| session.user_id.as_deref() == Some(u)) {
                sessions.push(session.clone());
            }
        }
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        sessions
    }

    /// Archives and removes the session. If archiving fails the session stays active.
    pub async fn close_session(&self, session_id: &str) -> Result<Session, ControllerError> {
        let handle = self.session_handle(session_id)?;
        let mut session = handle.lock().await;
        self.close_locked(&mut session).await?;
        Ok(session.clone())
    }

    async fn close_locked(&self, session: &mut Session) -> Result<(), ControllerError> {
        if session.state == SessionState::Closed {
            return Err(ControllerError::SessionNotFound(session.id.clone()));
        }

        session.state = SessionState::Closed;
        session.closed_at = Some(Utc::now());

        if let Err(e) = self.memory.archive_session(session).await {
            session.state = SessionState::Active;
            session.closed_at = None;
            tracing::error!("Failed to archive session {}: {}", session.id, e);
            return Err(e.into());
        }

        self.sessions.remove(&session.id);
        tracing::info!("Closed session {}", session.id);
        Ok(())
    }

    /// Closes sessions with no message for `max_idle_hours`. A session whose
    /// archive fails stays open for the next round.
    pub async fn close_idle_sessions(&self, max_idle_hours: i64) -> usize {
        let cutoff = Utc::now() - Duration::hours(max_idle_hours);
        let handles: Vec<Arc<Mutex<Session>>> = self.sessions.iter().map(|s| s.value().clone()).collect();

        let mut closed = 0;
        for handle in handles {
            let mut session = handle.lock().await;
            if session.state == SessionState::Closed || last_activity(&session) >= cutoff {
                continue;
            }
            match self.close_locked(&mut session).await {
                Ok(()) => closed += 1,
                Err(e) => tracing::warn!("Idle session {} left open: {}", session.id, e),
            }
        }
        closed
    }

    pub fn execution_status(&self, plan_id: &str) -> Option<Execution> {
        self.executor.execution_status(plan_id)
    }

    pub async fn system_stats(&self) -> SystemStats {
        SystemStats {
            active_sessions: self.sessions.len(),
            total_models: self.models.len(),
            models: self.models.names(),
            memory_usage: self.memory.usage_stats().await,
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds(),
        }
    }
}
