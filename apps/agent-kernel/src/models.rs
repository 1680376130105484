use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// === PLANNING ===

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    StrategicPlanning,
    Development,
    ContentCreation,
    SecurityAnalysis,
    Analysis,
    GeneralQuery,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Urgent,
    Negative,
    Positive,
    Neutral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Urgent,
    High,
    Normal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Simple,
    Medium,
    Complex,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPattern {
    NewConversation,
    OngoingConversation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryPatterns {
    pub pattern: ConversationPattern,
    pub frequency: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_topics: Vec<String>,
    #[serde(default)]
    pub avg_length: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageAnalysis {
    pub intent: Intent,
    pub entities: Vec<String>,
    pub sentiment: Sentiment,
    pub context_relevance: f64,
    pub history_patterns: HistoryPatterns,
    pub urgency: Urgency,
    pub scope: Scope,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Processing,
    Verification,
    Generic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub priority: u32,
    /// Seconds.
    pub estimated_time: u64,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub message: String,
    pub agent_type: String,
    pub analysis: MessageAnalysis,
    pub complexity: Complexity,
    pub tasks: Vec<Task>,
    pub required_models: BTreeSet<String>,
    pub estimated_duration: u64,
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub created_at: DateTime<Utc>,
}

// === EXECUTION ===

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskResult {
    Processing { output: String, prompt_used: String },
    Verification { verification_result: String, verified_tasks: Vec<String> },
    Generic { output: String },
}

impl TaskResult {
    pub fn text(&self) -> &str {
        match self {
            TaskResult::Processing { output, .. } | TaskResult::Generic { output } => output,
            TaskResult::Verification { verification_result, .. } => verification_result,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskOutput {
    pub task_id: String,
    pub result: TaskResult,
    pub model_used: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskOutcome {
    Completed(TaskOutput),
    Failed { task_id: String, error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub plan_id: String,
    pub started_at: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub completed_tasks: Vec<TaskRecord>,
    pub failed_tasks: Vec<TaskRecord>,
    pub results: BTreeMap<String, TaskOutcome>,
    pub session_context: Value,
    /// Task ids grouped by the batch they ran in, in execution order.
    pub batches: Vec<Vec<String>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Execution {
    pub fn new(plan_id: &str, session_context: Value) -> Self {
        Self {
            plan_id: plan_id.to_string(),
            started_at: Utc::now(),
            status: ExecutionStatus::Running,
            completed_tasks: Vec::new(),
            failed_tasks: Vec::new(),
            results: BTreeMap::new(),
            session_context,
            batches: Vec::new(),
            completed_at: None,
            failed_at: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Completed,
    Partial,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub plan_id: String,
    pub status: ResponseStatus,
    pub request_id: Uuid,
    #[serde(default)]
    pub completed_tasks: usize,
    #[serde(default)]
    pub failed_tasks: usize,
    #[serde(default)]
    pub total_tasks: usize,
    /// Seconds.
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default)]
    pub models_used: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    pub metadata: ResponseMetadata,
}

// === SESSIONS ===

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// 1-based sequence number within the session.
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Value>,
    #[serde(rename = "type")]
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub agent_type: String,
    pub user_id: Option<String>,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub state: SessionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(id: String, agent_type: &str, user_id: Option<String>, context: Map<String, Value>) -> Self {
        Self {
            id,
            agent_type: agent_type.to_string(),
            user_id,
            context,
            created_at: Utc::now(),
            messages: Vec::new(),
            state: SessionState::Active,
            closed_at: None,
        }
    }

    /// Appends a message with the next sequence number and returns that number.
    pub fn append_message(
        &mut self,
        role: MessageRole,
        content: &str,
        attachments: Vec<Value>,
        metadata: Option<Value>,
    ) -> u64 {
        let id = self.messages.len() as u64 + 1;
        self.messages.push(Message {
            id,
            timestamp: Utc::now(),
            content: content.to_string(),
            attachments,
            role,
            metadata,
        });
        id
    }
}

// === MEMORY ===

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub assistant_response: String,
    #[serde(default)]
    pub context: Value,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub access_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextEntry {
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}
