// [[KERNEL]]/apps/agent-kernel/src/events.rs
// Purpose: Per-agent event log. Bounded history, handler dispatch, statistics.
// Architecture: Domain Event Layer
// Dependencies: Serde, Chrono, Uuid, tokio broadcast

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::observability::{AgentMetrics, MetricsSummary};

pub const DEFAULT_EVENT_LIMIT: usize = 100;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
    #[error("Invalid priority {0}, expected 1..=4")]
    InvalidPriority(u8),
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to serialize events: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ConsultationStarted,
    ConsultationCompleted,
    StrategyGenerated,
    MarketAnalysis,
    CompetitiveAnalysis,
    RiskAssessment,
    BusinessPlan,
    GrowthStrategy,
    ConversationStarted,
    ConversationCompleted,
    RequestProcessed,
    PerformanceMetric,
    ErrorOccurred,
    SessionStarted,
    SessionEnded,
    UserFeedback,
    SystemStatus,
}

impl EventType {
    pub const ALL: &'static [EventType] = &[
        EventType::ConsultationStarted,
        EventType::ConsultationCompleted,
        EventType::StrategyGenerated,
        EventType::MarketAnalysis,
        EventType::CompetitiveAnalysis,
        EventType::RiskAssessment,
        EventType::BusinessPlan,
        EventType::GrowthStrategy,
        EventType::ConversationStarted,
        EventType::ConversationCompleted,
        EventType::RequestProcessed,
        EventType::PerformanceMetric,
        EventType::ErrorOccurred,
        EventType::SessionStarted,
        EventType::SessionEnded,
        EventType::UserFeedback,
        EventType::SystemStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ConsultationStarted => "consultation_started",
            EventType::ConsultationCompleted => "consultation_completed",
            EventType::StrategyGenerated => "strategy_generated",
            EventType::MarketAnalysis => "market_analysis",
            EventType::CompetitiveAnalysis => "competitive_analysis",
            EventType::RiskAssessment => "risk_assessment",
            EventType::BusinessPlan => "business_plan",
            EventType::GrowthStrategy => "growth_strategy",
            EventType::ConversationStarted => "conversation_started",
            EventType::ConversationCompleted => "conversation_completed",
            EventType::RequestProcessed => "request_processed",
            EventType::PerformanceMetric => "performance_metric",
            EventType::ErrorOccurred => "error_occurred",
            EventType::SessionStarted => "session_started",
            EventType::SessionEnded => "session_ended",
            EventType::UserFeedback => "user_feedback",
            EventType::SystemStatus => "system_status",
        }
    }
}

impl FromStr for EventType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EventError::UnknownEventType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum EventPriority {
    #[default]
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl EventPriority {
    pub fn from_severity(severity: &str) -> Self {
        match severity {
            "low" => EventPriority::Low,
            "high" => EventPriority::High,
            "critical" => EventPriority::Critical,
            _ => EventPriority::Medium,
        }
    }
}

impl From<EventPriority> for u8 {
    fn from(priority: EventPriority) -> Self {
        priority as u8
    }
}

impl TryFrom<u8> for EventPriority {
    type Error = EventError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EventPriority::Low),
            2 => Ok(EventPriority::Medium),
            3 => Ok(EventPriority::High),
            4 => Ok(EventPriority::Critical),
            other => Err(EventError::InvalidPriority(other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
    pub metadata: Value,
    pub priority: EventPriority,
    pub source: String,
}

pub type EventHandler = Arc<dyn Fn(&AgentEvent) -> Result<(), String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HandlerId(u64);

#[derive(Debug, Clone)]
pub struct EventFilter {
    pub session_id: Option<String>,
    pub event_type: Option<EventType>,
    pub limit: usize,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            session_id: None,
            event_type: None,
            limit: DEFAULT_EVENT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventStatistics {
    pub total_events: usize,
    pub event_types: BTreeMap<String, usize>,
    pub active_sessions: usize,
    pub session_distribution: BTreeMap<String, usize>,
    pub priority_distribution: BTreeMap<u8, usize>,
    pub time_range_seconds: f64,
    pub events_per_hour: f64,
    pub most_common_event: Option<String>,
    /// Events in the last hour.
    pub recent_activity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
}

impl FromStr for ExportFormat {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            other => Err(EventError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn as_object(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        Value::Null => Value::Object(Map::new()),
        other => json!({ "value": other }),
    }
}

fn unix_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

/// Event log owned by one agent.
///
/// History is a ring: once `max_history_size` is exceeded the oldest events are
/// dropped. Durable records go through the `agent_events` tracing target, which
/// sees every emission regardless of ring retention.
pub struct EventManager {
    source: String,
    max_history_size: usize,
    history: Mutex<VecDeque<AgentEvent>>,
    handlers: RwLock<HashMap<EventType, Vec<(HandlerId, EventHandler)>>>,
    next_handler_id: AtomicU64,
    analytics: Mutex<AgentMetrics>,
    event_bus: broadcast::Sender<AgentEvent>,
}

impl EventManager {
    pub fn new(source: &str, max_history_size: usize) -> Self {
        let (tx, _) = broadcast::channel(100);

        Self {
            source: source.to_string(),
            max_history_size: max_history_size.max(1),
            history: Mutex::new(VecDeque::new()),
            handlers: RwLock::new(HashMap::new()),
            next_handler_id: AtomicU64::new(1),
            analytics: Mutex::new(AgentMetrics::default()),
            event_bus: tx,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn register_handler<F>(&self, event_type: EventType, handler: F) -> HandlerId
    where
        F: Fn(&AgentEvent) -> Result<(), String> + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Returns false when no such handler was registered for that type.
    pub fn unregister_handler(&self, event_type: EventType, handler_id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        match handlers.get_mut(&event_type) {
            Some(list) => {
                let before = list.len();
                list.retain(|(id, _)| *id != handler_id);
                list.len() != before
            }
            None => false,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_bus.subscribe()
    }

    /// Records an event and returns its id. Handlers, analytics and broadcast are
    /// best-effort and never fail the emission.
    pub fn emit_event(
        &self,
        event_type: EventType,
        session_id: &str,
        data: Value,
        metadata: Value,
        priority: EventPriority,
    ) -> Uuid {
        let event = AgentEvent {
            event_id: Uuid::new_v4(),
            event_type,
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            data: as_object(data),
            metadata: as_object(metadata),
            priority,
            source: self.source.clone(),
        };

        {
            let mut history = lock(&self.history);
            history.push_back(event.clone());
            while history.len() > self.max_history_size {
                history.pop_front();
            }
        }

        self.process_event_handlers(&event);

        tracing::info!(
            target: "agent_events",
            source = %self.source,
            event_id = %event.event_id,
            event_type = event.event_type.as_str(),
            session_id = %event.session_id,
            priority = u8::from(event.priority),
            data = %event.data,
            metadata = %event.metadata,
            "event emitted"
        );

        self.update_analytics(&event);

        // No subscribers is the common case.
        let _ = self.event_bus.send(event.clone());

        event.event_id
    }

    fn process_event_handlers(&self, event: &AgentEvent) {
        // Clone out so a handler may itself emit or register.
        let handlers: Vec<(HandlerId, EventHandler)> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(
                    request_id = %Uuid::new_v4(),
                    "Event handler {:?} failed for {}: {}",
                    id,
                    event.event_type.as_str(),
                    e
                ),
                Err(_) => tracing::error!(
                    request_id = %Uuid::new_v4(),
                    "Event handler {:?} panicked for {}",
                    id,
                    event.event_type.as_str()
                ),
            }
        }
    }

    fn update_analytics(&self, event: &AgentEvent) {
        let mut analytics = lock(&self.analytics);
        let data = &event.data;

        match event.event_type {
            EventType::ConsultationCompleted => {
                let text = |key: &str, default: &'static str| {
                    data.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or(default)
                        .to_string()
                };
                analytics.track_consultation(
                    &text("type", "general"),
                    &text("complexity", "moderate"),
                    &text("deliverable_type", "advice"),
                    data.get("duration").and_then(Value::as_f64).unwrap_or(0.0),
                );
            }
            EventType::UserFeedback => {
                if let Some(rating) = data.get("rating").and_then(Value::as_f64) {
                    analytics.track_satisfaction(rating);
                }
            }
            EventType::ErrorOccurred => analytics.track_error(),
            _ => {}
        }
    }

    /// Matching events, newest first.
    pub fn get_events(&self, filter: &EventFilter) -> Vec<AgentEvent> {
        let mut events: Vec<AgentEvent> = {
            let history = lock(&self.history);
            history
                .iter()
                .rev()
                .filter(|e| filter.session_id.as_deref().map_or(true, |s| e.session_id == s))
                .filter(|e| filter.event_type.map_or(true, |t| e.event_type == t))
                .cloned()
                .collect()
        };

        // Stable: equal timestamps keep newest-first insertion order.
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(filter.limit);
        events
    }

    pub fn get_event_statistics(&self) -> EventStatistics {
        let events: Vec<AgentEvent> = lock(&self.history).iter().cloned().collect();

        if events.is_empty() {
            return EventStatistics::default();
        }

        let mut event_types: BTreeMap<String, usize> = BTreeMap::new();
        let mut first_seen: Vec<&'static str> = Vec::new();
        let mut session_distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut priority_distribution: BTreeMap<u8, usize> = (1..=4).map(|p| (p, 0)).collect();

        for event in &events {
            let name = event.event_type.as_str();
            let count = event_types.entry(name.to_string()).or_insert(0);
            if *count == 0 {
                first_seen.push(name);
            }
            *count += 1;
            *session_distribution.entry(event.session_id.clone()).or_insert(0) += 1;
            *priority_distribution.entry(event.priority.into()).or_insert(0) += 1;
        }

        let (min_ts, max_ts) = events.iter().fold((events[0].timestamp, events[0].timestamp), |(lo, hi), e| {
            (lo.min(e.timestamp), hi.max(e.timestamp))
        });
        let time_range_seconds = (max_ts - min_ts).num_milliseconds() as f64 / 1000.0;
        let events_per_hour = if time_range_seconds > 0.0 {
            events.len() as f64 / (time_range_seconds / 3600.0)
        } else {
            0.0
        };

        // Ties go to the type seen first.
        let mut most_common_event: Option<(&str, usize)> = None;
        for name in first_seen {
            let count = event_types.get(name).copied().unwrap_or(0);
            if most_common_event.map_or(true, |(_, best)| count > best) {
                most_common_event = Some((name, count));
            }
        }

        let hour_ago = Utc::now() - Duration::hours(1);

        EventStatistics {
            total_events: events.len(),
            active_sessions: session_distribution.len(),
            event_types,
            session_distribution,
            priority_distribution,
            time_range_seconds,
            events_per_hour,
            most_common_event: most_common_event.map(|(name, _)| name.to_string()),
            recent_activity: events.iter().filter(|e| e.timestamp > hour_ago).count(),
        }
    }

    /// Drops events older than `max_age_hours` and returns how many were removed.
    pub fn clear_old_events(&self, max_age_hours: i64) -> usize {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        let mut history = lock(&self.history);
        let before = history.len();
        history.retain(|e| e.timestamp > cutoff);
        before - history.len()
    }

    pub fn export_events(&self, session_id: Option<&str>, format: &str) -> Result<String, EventError> {
        match format.parse::<ExportFormat>()? {
            ExportFormat::Json => {
                let events = self.get_events(&EventFilter {
                    session_id: session_id.map(str::to_string),
                    ..EventFilter::default()
                });
                serde_json::to_string_pretty(&events).map_err(|e| EventError::Serialization(e.to_string()))
            }
        }
    }

    pub fn metrics_summary(&self) -> MetricsSummary {
        lock(&self.analytics).summary()
    }

    // === CONVENIENCE EMITTERS ===

    pub fn emit_consultation_started(&self, session_id: &str, consultation_type: &str, client_info: Value) -> Uuid {
        self.emit_event(
            EventType::ConsultationStarted,
            session_id,
            json!({
                "consultation_type": consultation_type,
                "client_info": client_info,
                "start_time": unix_seconds(Utc::now()),
            }),
            Value::Null,
            EventPriority::Medium,
        )
    }

    pub fn emit_consultation_completed(
        &self,
        session_id: &str,
        duration_secs: f64,
        deliverables: &[String],
        satisfaction_rating: Option<u8>,
    ) -> Uuid {
        self.emit_event(
            EventType::ConsultationCompleted,
            session_id,
            json!({
                "duration": duration_secs,
                "deliverables": deliverables,
                "satisfaction_rating": satisfaction_rating,
                "completion_time": unix_seconds(Utc::now()),
            }),
            Value::Null,
            EventPriority::Medium,
        )
    }

    pub fn emit_strategy_generated(
        &self,
        session_id: &str,
        strategy_type: &str,
        components: &[String],
        complexity: &str,
    ) -> Uuid {
        self.emit_event(
            EventType::StrategyGenerated,
            session_id,
            json!({
                "strategy_type": strategy_type,
                "components": components,
                "complexity": complexity,
                "generation_time": unix_seconds(Utc::now()),
            }),
            Value::Null,
            EventPriority::High,
        )
    }

    pub fn emit_error_occurred(&self, session_id: &str, error_type: &str, error_message: &str, severity: &str) -> Uuid {
        self.emit_event(
            EventType::ErrorOccurred,
            session_id,
            json!({
                "error_type": error_type,
                "error_message": error_message,
                "severity": severity,
                "error_time": unix_seconds(Utc::now()),
            }),
            Value::Null,
            EventPriority::from_severity(severity),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn emit(manager: &EventManager, event_type: EventType, session: &str) -> Uuid {
        manager.emit_event(event_type, session, json!({}), Value::Null, EventPriority::Low)
    }

    fn all_events(manager: &EventManager) -> Vec<AgentEvent> {
        manager.get_events(&EventFilter {
            limit: usize::MAX,
            ..EventFilter::default()
        })
    }

    #[test]
    fn test_ring_keeps_last_three_newest_first() {
        let manager = EventManager::new("strategist", 3);
        let mut ids = Vec::new();
        for i in 0..5 {
            let event_type = if i % 2 == 0 {
                EventType::SessionStarted
            } else {
                EventType::RequestProcessed
            };
            ids.push(emit(&manager, event_type, "s1"));
        }

        let events = manager.get_events(&EventFilter {
            limit: 10,
            ..EventFilter::default()
        });
        let returned: Vec<Uuid> = events.iter().map(|e| e.event_id).collect();
        assert_eq!(returned, vec![ids[4], ids[3], ids[2]]);
    }

    #[test]
    fn test_history_never_exceeds_bound() {
        let manager = EventManager::new("developer", 50);
        let mut first_ids = Vec::new();
        for i in 0..120 {
            let id = emit(&manager, EventType::PerformanceMetric, &format!("s{}", i % 7));
            if i < 70 {
                first_ids.push(id);
            }
        }

        let events = all_events(&manager);
        assert_eq!(events.len(), 50);
        assert!(events.iter().all(|e| !first_ids.contains(&e.event_id)));
    }

    #[test]
    fn test_filters_by_session_and_type() {
        let manager = EventManager::new("strategist", 100);
        emit(&manager, EventType::SessionStarted, "a");
        emit(&manager, EventType::UserFeedback, "a");
        emit(&manager, EventType::SessionStarted, "b");

        let only_a = manager.get_events(&EventFilter {
            session_id: Some("a".to_string()),
            ..EventFilter::default()
        });
        assert_eq!(only_a.len(), 2);

        let started = manager.get_events(&EventFilter {
            event_type: Some(EventType::SessionStarted),
            ..EventFilter::default()
        });
        assert_eq!(started.len(), 2);
        assert!(started.iter().all(|e| e.event_type == EventType::SessionStarted));

        let limited = manager.get_events(&EventFilter {
            limit: 1,
            ..EventFilter::default()
        });
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].session_id, "b");
    }

    #[test]
    fn test_handlers_run_in_order_and_failures_are_isolated() {
        let manager = EventManager::new("strategist", 10);
        let calls = Arc::new(Mutex::new(Vec::new()));

        let c1 = calls.clone();
        manager.register_handler(EventType::ConsultationStarted, move |_| {
            c1.lock().unwrap().push("first");
            Err("first handler refuses".to_string())
        });
        manager.register_handler(EventType::ConsultationStarted, |_| panic!("handler blew up"));
        let c3 = calls.clone();
        manager.register_handler(EventType::ConsultationStarted, move |_| {
            c3.lock().unwrap().push("third");
            Ok(())
        });

        let id = manager.emit_consultation_started("s1", "growth", json!({"name": "Acme"}));

        assert_eq!(*calls.lock().unwrap(), vec!["first", "third"]);
        assert_eq!(all_events(&manager)[0].event_id, id);
    }

    #[test]
    fn test_unregister_handler() {
        let manager = EventManager::new("strategist", 10);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = manager.register_handler(EventType::SystemStatus, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        emit(&manager, EventType::SystemStatus, "s");
        assert!(manager.unregister_handler(EventType::SystemStatus, id));
        assert!(!manager.unregister_handler(EventType::SystemStatus, id));
        emit(&manager, EventType::SystemStatus, "s");

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handlers_only_see_their_type() {
        let manager = EventManager::new("strategist", 10);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        manager.register_handler(EventType::UserFeedback, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        emit(&manager, EventType::SessionEnded, "s");
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_statistics() {
        let manager = EventManager::new("strategist", 100);
        emit(&manager, EventType::SessionStarted, "a");
        emit(&manager, EventType::RequestProcessed, "a");
        emit(&manager, EventType::RequestProcessed, "b");
        manager.emit_error_occurred("b", "timeout", "model timed out", "critical");

        let stats = manager.get_event_statistics();
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.event_types["request_processed"], 2);
        assert_eq!(stats.active_sessions, 2);
        assert_eq!(stats.session_distribution["b"], 2);
        assert_eq!(stats.priority_distribution[&1], 3);
        assert_eq!(stats.priority_distribution[&2], 0);
        assert_eq!(stats.priority_distribution[&4], 1);
        assert_eq!(stats.most_common_event.as_deref(), Some("request_processed"));
        assert_eq!(stats.recent_activity, 4);
        assert!(stats.time_range_seconds >= 0.0);
    }

    #[test]
    fn test_statistics_empty_and_tie_break() {
        let manager = EventManager::new("strategist", 100);
        assert_eq!(manager.get_event_statistics().total_events, 0);

        emit(&manager, EventType::UserFeedback, "a");
        emit(&manager, EventType::SessionStarted, "a");
        assert_eq!(
            manager.get_event_statistics().most_common_event.as_deref(),
            Some("user_feedback")
        );
    }

    #[test]
    fn test_clear_old_events() {
        let manager = EventManager::new("strategist", 100);
        emit(&manager, EventType::SessionStarted, "a");
        emit(&manager, EventType::SessionEnded, "a");

        assert_eq!(manager.clear_old_events(24), 0);
        assert_eq!(all_events(&manager).len(), 2);

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(manager.clear_old_events(0), 2);
        assert!(all_events(&manager).is_empty());
    }

    #[test]
    fn test_export_json_and_unsupported_format() {
        let manager = EventManager::new("strategist", 100);
        emit(&manager, EventType::SessionStarted, "a");
        emit(&manager, EventType::SessionStarted, "b");

        let exported = manager.export_events(Some("a"), "JSON").unwrap();
        let parsed: Vec<AgentEvent> = serde_json::from_str(&exported).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].session_id, "a");
        assert_eq!(parsed[0].source, "strategist");

        assert_eq!(
            manager.export_events(None, "csv"),
            Err(EventError::UnsupportedFormat("csv".to_string()))
        );
    }

    #[test]
    fn test_analytics_follow_events() {
        let manager = EventManager::new("strategist", 100);
        manager.emit_event(
            EventType::ConsultationCompleted,
            "a",
            json!({"duration": 12.0, "type": "growth"}),
            Value::Null,
            EventPriority::Medium,
        );
        manager.emit_event(
            EventType::UserFeedback,
            "a",
            json!({"rating": 5}),
            Value::Null,
            EventPriority::Low,
        );
        manager.emit_error_occurred("a", "model", "boom", "high");

        let summary = manager.metrics_summary();
        assert_eq!(summary.consultations, 1);
        assert_eq!(summary.avg_consultation_secs, 12.0);
        assert_eq!(summary.avg_satisfaction, Some(5.0));
        assert_eq!(summary.most_requested_consultation.as_deref(), Some("growth"));
        assert_eq!(summary.total_errors, 1);
    }

    #[test]
    fn test_priority_and_type_parsing() {
        assert_eq!(EventPriority::from_severity("critical"), EventPriority::Critical);
        assert_eq!(EventPriority::from_severity("whatever"), EventPriority::Medium);
        assert_eq!(EventPriority::try_from(5), Err(EventError::InvalidPriority(5)));
        assert_eq!("user_feedback".parse::<EventType>(), Ok(EventType::UserFeedback));
        assert!("nonsense".parse::<EventType>().is_err());

        let json = serde_json::to_value(EventPriority::High).unwrap();
        assert_eq!(json, json!(3));
    }

    #[tokio::test]
    async fn test_subscribers_receive_emitted_events() {
        let manager = EventManager::new("strategist", 10);
        let mut rx = manager.subscribe();
        let id = emit(&manager, EventType::SessionStarted, "live");

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_id, id);
        assert_eq!(received.session_id, "live");
    }
}
