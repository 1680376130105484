// [[KERNEL]]/apps/agent-kernel/src/memory.rs
// Purpose: Session interactions, keyword-overlap knowledge store and per-session
//          context cache, persisted through the JSON store.
// Architecture: State Layer
// Dependencies: DashMap, tokio RwLock, Storage

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::{ContextEntry, Interaction, KnowledgeItem, Message, MessageRole, Session, SessionState};
use crate::planner::{EMAIL_RE, URL_RE};
use crate::storage::{JsonStore, StorageError};

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(\w+)?\n(.*?)```").expect("valid code block pattern"));

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("valid name pattern"));

const KNOWLEDGE_TRIGGERS: &[&str] = &["what is", "how to", "explain", "define"];

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Unknown memory type: {0}")]
    UnknownKind(String),
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub max_short_term_items: usize,
    pub max_context_items: usize,
    pub max_session_age_hours: i64,
    /// Context cache is written out every this many updates.
    pub context_flush_interval: u64,
    pub archive_on_evict: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_short_term_items: 1000,
            max_context_items: 500,
            max_session_age_hours: 24,
            context_flush_interval: 50,
            archive_on_evict: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Interactions,
    Knowledge,
    Context,
}

impl MemoryKind {
    pub const ALL: [MemoryKind; 3] = [MemoryKind::Interactions, MemoryKind::Knowledge, MemoryKind::Context];
}

impl FromStr for MemoryKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interactions" | "interaction" => Ok(MemoryKind::Interactions),
            "knowledge" => Ok(MemoryKind::Knowledge),
            "context" => Ok(MemoryKind::Context),
            other => Err(MemoryError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextHit {
    pub session_id: String,
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MemoryHit {
    Interaction { relevance_score: f64, data: Interaction },
    Knowledge { relevance_score: f64, data: KnowledgeItem },
    Context { relevance_score: f64, data: ContextHit },
}

impl MemoryHit {
    pub fn relevance_score(&self) -> f64 {
        match self {
            MemoryHit::Interaction { relevance_score, .. }
            | MemoryHit::Knowledge { relevance_score, .. }
            | MemoryHit::Context { relevance_score, .. } => *relevance_score,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MemoryHit::Interaction { data, .. } => data.timestamp,
            MemoryHit::Knowledge { data, .. } => data.created_at,
            MemoryHit::Context { data, .. } => data.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryUsage {
    pub short_term_sessions: usize,
    pub short_term_interactions: usize,
    pub context_cache_items: usize,
    pub knowledge_base_items: usize,
    pub storage_path: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CleanupReport {
    pub expired_sessions: usize,
    pub overflow_sessions: usize,
    /// Sessions whose archive file gained interactions during eviction.
    pub spilled_sessions: usize,
    /// Sessions kept in memory because spilling them failed.
    pub retained_sessions: usize,
}

#[derive(Debug, Serialize)]
struct MemoryExport<'a> {
    exported_at: DateTime<Utc>,
    stats: MemoryUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    sessions: Option<BTreeMap<String, Vec<Interaction>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<ContextSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    knowledge_base: Option<&'a [KnowledgeItem]>,
}

type SessionContext = BTreeMap<String, ContextEntry>;
type ContextSnapshot = BTreeMap<String, SessionContext>;

fn words(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Share of query words present in `text`; 0.0 for an empty query.
fn overlap_ratio(query: &HashSet<String>, text: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let text_words = words(text);
    query.intersection(&text_words).count() as f64 / query.len() as f64
}

fn last_activity(context: &SessionContext) -> Option<DateTime<Utc>> {
    context.values().map(|entry| entry.updated_at).max()
}

fn extract_text_entities(text: &str) -> Vec<(&'static str, String)> {
    let mut entities = Vec::new();

    if let Some(url) = URL_RE.find(text) {
        entities.push(("url", url.as_str().to_string()));
    }
    if let Some(email) = EMAIL_RE.find(text) {
        entities.push(("email", email.as_str().to_string()));
    }
    let names: Vec<&str> = NAME_RE.find_iter(text).take(2).map(|m| m.as_str()).collect();
    if !names.is_empty() {
        entities.push(("name", names.join(" ")));
    }

    entities
}

/// Rebuilds interactions from an archived session: user message `k` pairs with
/// assistant message `k + 1`.
fn interactions_from_session(session: &Session) -> Vec<Interaction> {
    session
        .messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .filter_map(|user| {
            session
                .messages
                .iter()
                .find(|m| m.id == user.id + 1 && m.role == MessageRole::Assistant)
                .map(|assistant| Interaction {
                    timestamp: user.timestamp,
                    user_message: user.content.clone(),
                    assistant_response: assistant.content.clone(),
                    context: assistant.metadata.clone().unwrap_or_else(|| json!({})),
                    session_id: session.id.clone(),
                })
        })
        .collect()
}

fn same_exchange(a: &Interaction, b: &Interaction) -> bool {
    a.timestamp == b.timestamp && a.user_message == b.user_message && a.assistant_response == b.assistant_response
}

/// Appends each interaction as a user/assistant message pair after the
/// session's highest message id.
fn append_exchanges<'a>(session: &mut Session, interactions: impl IntoIterator<Item = &'a Interaction>) {
    let mut next_id = session.messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;
    for interaction in interactions {
        session.messages.push(Message {
            id: next_id,
            timestamp: interaction.timestamp,
            content: interaction.user_message.clone(),
            attachments: Vec::new(),
            role: MessageRole::User,
            metadata: None,
        });
        session.messages.push(Message {
            id: next_id + 1,
            timestamp: interaction.timestamp,
            content: interaction.assistant_response.clone(),
            attachments: Vec::new(),
            role: MessageRole::Assistant,
            metadata: Some(interaction.context.clone()),
        });
        next_id += 2;
    }
}

/// Session-shaped record for interactions that never went through an explicit close.
fn spilled_session(session_id: &str) -> Session {
    let mut session = Session::new(session_id.to_string(), "unknown", None, Map::new());
    session.state = SessionState::Closed;
    session.closed_at = Some(Utc::now());
    session
}

pub struct MemoryManager {
    store: JsonStore,
    config: MemoryConfig,
    short_term: DashMap<String, Vec<Interaction>>,
    knowledge: RwLock<Vec<KnowledgeItem>>,
    context: DashMap<String, SessionContext>,
    context_updates: AtomicU64,
    /// Serialises read-modify-write of session archive files.
    archive_lock: Mutex<()>,
}

impl MemoryManager {
    /// Prepares the storage layout and loads the knowledge base and context cache.
    /// A corrupt file is an error, never silently replaced.
    pub async fn open(store: JsonStore, config: MemoryConfig) -> Result<Self, MemoryError> {
        store.init().await?;

        let knowledge: Vec<KnowledgeItem> = store.read(&store.knowledge_path()).await?.unwrap_or_default();
        let context: ContextSnapshot = store.read(&store.context_path()).await?.unwrap_or_default();

        tracing::info!(
            "Loaded {} knowledge items and context for {} sessions",
            knowledge.len(),
            context.len()
        );

        Ok(Self {
            store,
            config,
            short_term: DashMap::new(),
            knowledge: RwLock::new(knowledge),
            context: context.into_iter().collect(),
            context_updates: AtomicU64::new(0),
            archive_lock: Mutex::new(()),
        })
    }

    pub async fn store_interaction(
        &self,
        session_id: &str,
        user_message: &str,
        assistant_response: &str,
        context: Value,
    ) -> Result<(), MemoryError> {
        let interaction = Interaction {
            timestamp: Utc::now(),
            user_message: user_message.to_string(),
            assistant_response: assistant_response.to_string(),
            context,
            session_id: session_id.to_string(),
        };

        self.short_term
            .entry(session_id.to_string())
            .or_default()
            .push(interaction.clone());

        self.update_context_cache(&interaction).await?;
        self.extract_knowledge(&interaction).await?;
        Ok(())
    }

    async fn update_context_cache(&self, interaction: &Interaction) -> Result<(), MemoryError> {
        let session_id = &interaction.session_id;
        self.update_context(session_id, "last_activity", Value::from(Utc::now().to_rfc3339()))
            .await?;

        for (kind, value) in extract_text_entities(&interaction.user_message) {
            self.update_context(session_id, &format!("entity_{}", kind), Value::from(value))
                .await?;
        }
        Ok(())
    }

    async fn extract_knowledge(&self, interaction: &Interaction) -> Result<(), MemoryError> {
        let question = interaction.user_message.to_lowercase();
        let session_meta = json!({ "session_id": interaction.session_id });

        if KNOWLEDGE_TRIGGERS.iter().any(|t| question.contains(t)) {
            self.store_knowledge(
                "qa",
                &format!("Q: {}\nA: {}", interaction.user_message, interaction.assistant_response),
                &["conversation", "qa"],
                session_meta.clone(),
            )
            .await?;
        }

        for caps in CODE_BLOCK_RE.captures_iter(&interaction.assistant_response) {
            let language = caps.get(1).map(|m| m.as_str());
            let code = caps.get(2).map_or("", |m| m.as_str()).trim();
            self.store_knowledge(
                "code",
                code,
                &["code", language.unwrap_or("unknown")],
                json!({ "session_id": interaction.session_id, "language": language }),
            )
            .await?;
        }
        Ok(())
    }

    /// Last `max_interactions` interactions, oldest first. Falls back to the
    /// archived session file when the session is not in memory.
    pub async fn get_session_context(
        &self,
        session_id: &str,
        max_interactions: usize,
    ) -> Result<Vec<Interaction>, MemoryError> {
        if !self.short_term.contains_key(session_id) {
            self.load_archived_session(session_id).await?;
        }

        Ok(self
            .short_term
            .get(session_id)
            .map(|interactions| {
                let start = interactions.len().saturating_sub(max_interactions);
                interactions[start..].to_vec()
            })
            .unwrap_or_default())
    }

    async fn load_archived_session(&self, session_id: &str) -> Result<(), MemoryError> {
        let path = self.store.session_path(session_id)?;
        if let Some(session) = self.store.read::<Session>(&path).await? {
            let interactions = interactions_from_session(&session);
            tracing::debug!(
                "Loaded {} archived interactions for session {}",
                interactions.len(),
                session_id
            );
            self.short_term.insert(session_id.to_string(), interactions);
        }
        Ok(())
    }

    /// Appends a knowledge item, persists the base and returns the new id.
    pub async fn store_knowledge(
        &self,
        kind: &str,
        content: &str,
        tags: &[&str],
        metadata: Value,
    ) -> Result<String, MemoryError> {
        let now = Utc::now();
        let short_id = Uuid::new_v4().simple().to_string();
        let item = KnowledgeItem {
            id: format!("{}_{}_{}", kind, now.format("%Y%m%d_%H%M%S"), &short_id[..8]),
            kind: kind.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            metadata,
            created_at: now,
            access_count: 0,
            last_accessed: None,
        };
        let id = item.id.clone();

        let mut knowledge = self.knowledge.write().await;
        knowledge.push(item);
        self.store.write(&self.store.knowledge_path(), &*knowledge).await?;

        tracing::info!("Stored knowledge item: {}", id);
        Ok(id)
    }

    /// Items ranked by the share of query words they contain. Ties keep
    /// insertion order. Returned items have their access bookkeeping bumped.
    pub async fn get_relevant_knowledge(&self, query: &str, max_items: usize) -> Vec<KnowledgeItem> {
        let query_words = words(query);
        let mut knowledge = self.knowledge.write().await;

        let mut scored: Vec<(usize, f64)> = knowledge
            .iter()
            .enumerate()
            .map(|(i, item)| (i, overlap_ratio(&query_words, &format!("{} {}", item.content, item.tags.join(" ")))))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(max_items);

        let now = Utc::now();
        scored
            .into_iter()
            .map(|(i, _)| {
                let item = &mut knowledge[i];
                item.access_count += 1;
                item.last_accessed = Some(now);
                item.clone()
            })
            .collect()
    }

    fn score_knowledge_hits(&self, query_words: &HashSet<String>, items: Vec<KnowledgeItem>) -> Vec<MemoryHit> {
        items
            .into_iter()
            .map(|item| MemoryHit::Knowledge {
                relevance_score: overlap_ratio(query_words, &format!("{} {}", item.content, item.tags.join(" "))),
                data: item,
            })
            .collect()
    }

    pub async fn update_context(&self, session_id: &str, key: &str, value: Value) -> Result<(), MemoryError> {
        let is_new = {
            let mut entry = self.context.entry(session_id.to_string()).or_default();
            let is_new = entry.is_empty();
            entry.insert(
                key.to_string(),
                ContextEntry {
                    value,
                    updated_at: Utc::now(),
                },
            );
            is_new
        };

        if is_new {
            self.enforce_context_cap(session_id);
        }

        let updates = self.context_updates.fetch_add(1, Ordering::Relaxed) + 1;
        if self.config.context_flush_interval > 0 && updates % self.config.context_flush_interval == 0 {
            self.flush_context().await?;
        }
        Ok(())
    }

    /// Drops the least recently active sessions until the cache fits.
    fn enforce_context_cap(&self, keep: &str) {
        while self.context.len() > self.config.max_context_items {
            let oldest = self
                .context
                .iter()
                .filter(|e| e.key() != keep)
                .min_by_key(|e| last_activity(e.value()))
                .map(|e| e.key().clone());

            match oldest {
                Some(session_id) => {
                    self.context.remove(&session_id);
                    tracing::debug!("Dropped context for session {}", session_id);
                }
                None => break,
            }
        }
    }

    pub fn get_context(&self, session_id: &str, key: &str) -> Option<Value> {
        self.context
            .get(session_id)
            .and_then(|ctx| ctx.get(key).map(|entry| entry.value.clone()))
    }

    /// All context values for a session.
    pub fn get_session_context_values(&self, session_id: &str) -> Map<String, Value> {
        self.context
            .get(session_id)
            .map(|ctx| ctx.iter().map(|(k, v)| (k.clone(), v.value.clone())).collect())
            .unwrap_or_default()
    }

    async fn flush_context(&self) -> Result<(), MemoryError> {
        let snapshot: ContextSnapshot = self
            .context
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        self.store.write(&self.store.context_path(), &snapshot).await?;
        Ok(())
    }

    /// Writes the session to `sessions/{id}.json` and drops it from short-term memory.
    /// Context stays cached until cleanup.
    pub async fn archive_session(&self, session: &Session) -> Result<(), MemoryError> {
        let path = self.store.session_path(&session.id)?;
        let _guard = self.archive_lock.lock().await;
        self.store.write(&path, session).await?;
        self.short_term.remove(&session.id);
        tracing::info!("Archived session {}", session.id);
        Ok(())
    }

    pub async fn search_memory(&self, query: &str, kinds: &[MemoryKind], max_results: usize) -> Vec<MemoryHit> {
        let kinds: &[MemoryKind] = if kinds.is_empty() { &MemoryKind::ALL } else { kinds };
        let per_kind = (max_results / 3).max(1);
        let query_words = words(query);
        let mut results = Vec::new();

        if kinds.contains(&MemoryKind::Interactions) {
            results.extend(self.search_interactions(&query_words, per_kind));
        }
        if kinds.contains(&MemoryKind::Knowledge) {
            let items = self.get_relevant_knowledge(query, per_kind).await;
            results.extend(self.score_knowledge_hits(&query_words, items));
        }
        if kinds.contains(&MemoryKind::Context) {
            results.extend(self.search_context(&query_words, per_kind));
        }

        results.sort_by(|a, b| {
            b.relevance_score()
                .total_cmp(&a.relevance_score())
                .then_with(|| b.timestamp().cmp(&a.timestamp()))
        });
        results.truncate(max_results);
        results
    }

    fn search_interactions(&self, query_words: &HashSet<String>, max_results: usize) -> Vec<MemoryHit> {
        let mut hits: Vec<MemoryHit> = self
            .short_term
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter_map(|interaction| {
                        let text = format!("{} {}", interaction.user_message, interaction.assistant_response);
                        let score = overlap_ratio(query_words, &text);
                        (score > 0.0).then(|| MemoryHit::Interaction {
                            relevance_score: score,
                            data: interaction.clone(),
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        hits.sort_by(|a, b| b.relevance_score().total_cmp(&a.relevance_score()));
        hits.truncate(max_results);
        hits
    }

    fn search_context(&self, query_words: &HashSet<String>, max_results: usize) -> Vec<MemoryHit> {
        let mut hits = Vec::new();

        for entry in self.context.iter() {
            for (key, item) in entry.value() {
                let value_text = match &item.value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let score = overlap_ratio(query_words, &format!("{} {}", key, value_text));
                if score > 0.0 {
                    hits.push(MemoryHit::Context {
                        relevance_score: score,
                        data: ContextHit {
                            session_id: entry.key().clone(),
                            key: key.clone(),
                            value: item.value.clone(),
                            updated_at: item.updated_at,
                        },
                    });
                }
            }
        }

        hits.sort_by(|a, b| b.relevance_score().total_cmp(&a.relevance_score()));
        hits.truncate(max_results);
        hits
    }

    /// Evicts expired sessions, then the oldest sessions past the size limit.
    /// With `archive_on_evict` interactions not yet on disk are merged into the
    /// session's archive file first; if that fails the session stays in memory.
    pub async fn cleanup_memory(&self) -> Result<CleanupReport, MemoryError> {
        let cutoff = Utc::now() - Duration::hours(self.config.max_session_age_hours);
        let mut report = CleanupReport::default();

        let mut by_age: Vec<(String, Option<DateTime<Utc>>)> = self
            .short_term
            .iter()
            .map(|e| (e.key().clone(), e.value().last().map(|i| i.timestamp)))
            .collect();

        let expired: Vec<String> = by_age
            .iter()
            .filter(|(_, last)| last.map_or(true, |ts| ts < cutoff))
            .map(|(id, _)| id.clone())
            .collect();

        for session_id in &expired {
            if self.evict(session_id, &mut report).await {
                report.expired_sessions += 1;
                self.context.remove(session_id);
            }
        }

        by_age.retain(|(id, _)| !expired.contains(id));
        if by_age.len() > self.config.max_short_term_items {
            by_age.sort_by_key(|(_, last)| *last);
            let excess = by_age.len() - self.config.max_short_term_items;
            for (session_id, _) in by_age.into_iter().take(excess) {
                if self.evict(&session_id, &mut report).await {
                    report.overflow_sessions += 1;
                }
            }
        }

        self.enforce_context_cap("");
        self.flush_context().await?;

        if report.expired_sessions + report.overflow_sessions > 0 {
            tracing::info!(
                "Cleaned up {} expired and {} overflow sessions ({} spilled to disk)",
                report.expired_sessions,
                report.overflow_sessions,
                report.spilled_sessions
            );
        }
        Ok(report)
    }

    async fn evict(&self, session_id: &str, report: &mut CleanupReport) -> bool {
        let snapshot = match self.short_term.get(session_id) {
            Some(entry) => entry.value().clone(),
            None => return false,
        };

        if self.config.archive_on_evict && !snapshot.is_empty() {
            match self.spill(session_id, &snapshot).await {
                Ok(true) => report.spilled_sessions += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        request_id = %Uuid::new_v4(),
                        "Keeping session {} in memory, spill failed: {}",
                        session_id,
                        e
                    );
                    report.retained_sessions += 1;
                    return false;
                }
            }
        }

        self.drop_if_unchanged(session_id, &snapshot)
    }

    /// Removes the short-term entry only if it still matches `snapshot`.
    /// Interactions stored while a spill was awaited keep the entry alive.
    fn drop_if_unchanged(&self, session_id: &str, snapshot: &[Interaction]) -> bool {
        let removed = self
            .short_term
            .remove_if(session_id, |_, current| {
                current.len() == snapshot.len() && current.last() == snapshot.last()
            })
            .is_some();
        if !removed {
            tracing::debug!("Session {} changed during cleanup, keeping it", session_id);
        }
        removed
    }

    /// Merges interactions missing from `sessions/{id}.json` into it, creating
    /// the file if needed. Returns whether anything was written.
    async fn spill(&self, session_id: &str, interactions: &[Interaction]) -> Result<bool, MemoryError> {
        let path = self.store.session_path(session_id)?;
        let _guard = self.archive_lock.lock().await;

        let mut session = self
            .store
            .read::<Session>(&path)
            .await?
            .unwrap_or_else(|| spilled_session(session_id));
        let archived = interactions_from_session(&session);

        let missing: Vec<&Interaction> = interactions
            .iter()
            .filter(|i| !archived.iter().any(|a| same_exchange(a, i)))
            .collect();
        if missing.is_empty() {
            return Ok(false);
        }

        append_exchanges(&mut session, missing);
        self.store.write(&path, &session).await?;
        Ok(true)
    }

    pub async fn usage_stats(&self) -> MemoryUsage {
        MemoryUsage {
            short_term_sessions: self.short_term.len(),
            short_term_interactions: self.short_term.iter().map(|e| e.value().len()).sum(),
            context_cache_items: self.context.len(),
            knowledge_base_items: self.knowledge.read().await.len(),
            storage_path: self.store.root().display().to_string(),
        }
    }

    /// Timestamped file under `<root>/exports/`.
    pub fn default_export_path(&self) -> PathBuf {
        self.store
            .root()
            .join("exports")
            .join(format!("memory_export_{}.json", Utc::now().format("%Y%m%d_%H%M%S")))
    }

    pub async fn export_memory(
        &self,
        export_path: &Path,
        include_sessions: bool,
        include_knowledge: bool,
    ) -> Result<(), MemoryError> {
        let stats = self.usage_stats().await;
        let knowledge = self.knowledge.read().await;

        let export = MemoryExport {
            exported_at: Utc::now(),
            stats,
            sessions: include_sessions.then(|| {
                self.short_term
                    .iter()
                    .map(|e| (e.key().clone(), e.value().clone()))
                    .collect()
            }),
            context: include_sessions.then(|| {
                self.context
                    .iter()
                    .map(|e| (e.key().clone(), e.value().clone()))
                    .collect()
            }),
            knowledge_base: include_knowledge.then(|| knowledge.as_slice()),
        };

        self.store.write(export_path, &export).await?;
        tracing::info!("Memory exported to {}", export_path.display());
        Ok(())
    }
}
