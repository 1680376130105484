// [[KERNEL]]/apps/agent-kernel/src/planner.rs
// Purpose: Turns one chat message into a dependency-linked task plan.
// Architecture: Cortex Layer
// Dependencies: regex, once_cell

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use uuid::Uuid;

use crate::models::{
    Complexity, ConversationPattern, HistoryPatterns, Intent, Message, MessageAnalysis, Plan,
    Scope, Sentiment, Task, TaskKind, Urgency,
};
use crate::registry::{self, CODING_MODEL, GENERAL_MODEL, SECURITY_MODEL};

pub static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:[a-zA-Z0-9]|[$-_@.&+]|[!*\(\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+")
        .expect("valid url pattern")
});

pub static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email pattern")
});

static CAPITALIZED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("valid capitalized pattern")
});

const MAX_NAME_ENTITIES: usize = 5;

/// Checked in order; the first group with a keyword in the message wins.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::StrategicPlanning, &["strategy", "plan", "business", "market"]),
    (Intent::Development, &["code", "develop", "build", "implement"]),
    (Intent::ContentCreation, &["write", "content", "article", "copy"]),
    (Intent::SecurityAnalysis, &["security", "vulnerability", "threat", "protect"]),
    (Intent::Analysis, &["analyze", "research", "investigate"]),
];

const URGENT_SENTIMENT: &[&str] = &["urgent", "asap", "immediately", "quickly", "fast"];
const NEGATIVE_SENTIMENT: &[&str] = &["bad", "terrible", "awful", "hate", "problem", "issue", "broken"];
const POSITIVE_SENTIMENT: &[&str] = &["good", "great", "excellent", "amazing", "perfect", "love", "like"];

const URGENT_INDICATORS: &[&str] = &["urgent", "asap", "immediately", "emergency", "critical", "quickly"];
const HIGH_INDICATORS: &[&str] = &["soon", "priority", "important", "needed"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[derive(Debug, Default, Clone)]
pub struct TaskPlanner;

impl TaskPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Builds a plan for `message`. Pure and infallible; unknown agent types get
    /// the generic step template.
    pub fn create_plan(
        &self,
        message: &str,
        agent_type: &str,
        context: &Map<String, Value>,
        history: &[Message],
    ) -> Plan {
        let analysis = self.analyze_message(message, context, history);
        let complexity = assess_complexity(&analysis);
        let profile = registry::profile_or_generic(agent_type);

        let tasks = decompose_tasks(profile.default_steps, complexity);
        let required_models = determine_models(&tasks, profile.base_models);
        let estimated_duration = tasks.iter().map(|t| t.estimated_time).sum();
        let dependencies: BTreeMap<String, Vec<String>> = tasks
            .iter()
            .filter(|t| !t.dependencies.is_empty())
            .map(|t| (t.id.clone(), t.dependencies.clone()))
            .collect();

        let now = Utc::now();
        let short_id = Uuid::new_v4().simple().to_string();
        let plan = Plan {
            id: format!("plan_{}_{}", now.format("%Y%m%d_%H%M%S"), &short_id[..8]),
            message: message.to_string(),
            agent_type: agent_type.to_string(),
            analysis,
            complexity,
            tasks,
            required_models,
            estimated_duration,
            dependencies,
            created_at: now,
        };

        tracing::info!(
            "Created plan {} with {} tasks ({:?} complexity) for agent {}",
            plan.id,
            plan.tasks.len(),
            plan.complexity,
            agent_type
        );

        plan
    }

    fn analyze_message(&self, message: &str, context: &Map<String, Value>, history: &[Message]) -> MessageAnalysis {
        let lowered = message.to_lowercase();

        MessageAnalysis {
            intent: classify_intent(&lowered),
            entities: extract_entities(message),
            sentiment: analyze_sentiment(&lowered),
            context_relevance: context_relevance(&lowered, context),
            history_patterns: history_patterns(history),
            urgency: assess_urgency(&lowered),
            scope: determine_scope(message),
        }
    }
}

fn classify_intent(lowered: &str) -> Intent {
    INTENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| contains_any(lowered, keywords))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::GeneralQuery)
}

/// URLs, then emails, then up to five capitalised word runs. First occurrence wins.
pub fn extract_entities(message: &str) -> Vec<String> {
    let urls = URL_RE.find_iter(message);
    let emails = EMAIL_RE.find_iter(message);
    let names = CAPITALIZED_RE.find_iter(message).take(MAX_NAME_ENTITIES);

    let mut seen = HashSet::new();
    urls.chain(emails)
        .chain(names)
        .map(|m| m.as_str().to_string())
        .filter(|entity| seen.insert(entity.clone()))
        .collect()
}

fn analyze_sentiment(lowered: &str) -> Sentiment {
    if contains_any(lowered, URGENT_SENTIMENT) {
        Sentiment::Urgent
    } else if contains_any(lowered, NEGATIVE_SENTIMENT) {
        Sentiment::Negative
    } else if contains_any(lowered, POSITIVE_SENTIMENT) {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    }
}

fn context_relevance(lowered: &str, context: &Map<String, Value>) -> f64 {
    let hits = context
        .values()
        .filter_map(Value::as_str)
        .filter(|value| lowered.contains(&value.to_lowercase()))
        .count();

    (0.5 + 0.1 * hits as f64).min(1.0)
}

fn history_patterns(history: &[Message]) -> HistoryPatterns {
    if history.is_empty() {
        return HistoryPatterns {
            pattern: ConversationPattern::NewConversation,
            frequency: 0,
            recent_topics: Vec::new(),
            avg_length: 0.0,
        };
    }

    let recent = &history[history.len().saturating_sub(5)..];
    let total_chars: usize = recent.iter().map(|m| m.content.chars().count()).sum();

    HistoryPatterns {
        pattern: ConversationPattern::OngoingConversation,
        frequency: history.len(),
        recent_topics: recent
            .iter()
            .map(|m| m.content.chars().take(50).collect())
            .collect(),
        avg_length: total_chars as f64 / recent.len() as f64,
    }
}

fn assess_urgency(lowered: &str) -> Urgency {
    if contains_any(lowered, URGENT_INDICATORS) {
        Urgency::Urgent
    } else if contains_any(lowered, HIGH_INDICATORS) {
        Urgency::High
    } else {
        Urgency::Normal
    }
}

fn determine_scope(message: &str) -> Scope {
    match message.chars().count() {
        n if n < 50 => Scope::Simple,
        n if n < 200 => Scope::Medium,
        _ => Scope::Complex,
    }
}

fn assess_complexity(analysis: &MessageAnalysis) -> Complexity {
    let mut score = 0;

    score += match analysis.intent {
        Intent::StrategicPlanning | Intent::Development => 2,
        Intent::SecurityAnalysis | Intent::Analysis => 1,
        _ => 0,
    };
    score += match analysis.scope {
        Scope::Complex => 2,
        Scope::Medium => 1,
        Scope::Simple => 0,
    };
    if analysis.urgency == Urgency::Urgent {
        score += 1;
    }
    if analysis.entities.len() > 3 {
        score += 1;
    }

    match score {
        s if s >= 5 => Complexity::High,
        s if s >= 3 => Complexity::Medium,
        _ => Complexity::Low,
    }
}

fn task_id(index: usize) -> String {
    format!("task_{}", index + 1)
}

/// Linear chain over `steps`: each task depends on the one before it.
fn chain(steps: &[&str], label: &str, base_time: u64, step_time: u64) -> Vec<Task> {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| Task {
            id: task_id(i),
            name: step.to_string(),
            description: format!("Execute {} for {} task", step, label),
            kind: TaskKind::Processing,
            priority: (steps.len() - i) as u32,
            estimated_time: base_time + step_time * i as u64,
            dependencies: if i > 0 { vec![task_id(i - 1)] } else { Vec::new() },
        })
        .collect()
}

fn decompose_tasks(steps: &[&str], complexity: Complexity) -> Vec<Task> {
    match complexity {
        Complexity::High => {
            let mut tasks = chain(steps, "complex", 30, 10);
            let verify_deps = tasks.last().map(|t| vec![t.id.clone()]).unwrap_or_default();
            tasks.push(Task {
                id: task_id(tasks.len()),
                name: "verify_results".to_string(),
                description: "Verify and validate results".to_string(),
                kind: TaskKind::Verification,
                priority: 1,
                estimated_time: 20,
                dependencies: verify_deps,
            });
            tasks
        }
        Complexity::Medium => chain(&steps[..steps.len().min(3)], "medium", 20, 5),
        Complexity::Low => vec![Task {
            id: task_id(0),
            name: "process_request".to_string(),
            description: "Process simple request".to_string(),
            kind: TaskKind::Processing,
            priority: 1,
            estimated_time: 15,
            dependencies: Vec::new(),
        }],
    }
}

fn determine_models(tasks: &[Task], base_models: &[&str]) -> BTreeSet<String> {
    let mut models: BTreeSet<String> = base_models.iter().map(|m| m.to_string()).collect();

    for task in tasks {
        let description = task.description.to_lowercase();
        if task.kind == TaskKind::Verification {
            models.insert(GENERAL_MODEL.to_string());
        } else if description.contains("code") {
            models.insert(CODING_MODEL.to_string());
        } else if description.contains("security") {
            models.insert(SECURITY_MODEL.to_string());
        }
    }

    models
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    fn plan(message: &str, agent_type: &str) -> Plan {
        TaskPlanner::new().create_plan(message, agent_type, &Map::new(), &[])
    }

    #[test]
    fn test_scenario_security_request_is_development() {
        let plan = plan(
            "Please urgently build me a secure login API, see https://example.com/docs and contact dev@example.com",
            "security_expert",
        );

        assert_eq!(plan.analysis.intent, Intent::Development);
        assert_eq!(plan.analysis.urgency, Urgency::Urgent);
        assert_eq!(plan.analysis.sentiment, Sentiment::Urgent);
        assert_eq!(
            plan.analysis.entities,
            vec!["https://example.com/docs", "dev@example.com", "Please"]
        );
        assert_eq!(plan.complexity, Complexity::Medium);
        assert_eq!(plan.tasks.len(), 3);
        assert_eq!(plan.tasks[0].name, "assess_security");
        assert!(plan.required_models.contains("deepseek-coder"));
        assert!(plan.required_models.contains("llama3.2"));
    }

    #[test]
    fn test_low_complexity_is_single_task() {
        let plan = plan("hello there", "developer");

        assert_eq!(plan.complexity, Complexity::Low);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].id, "task_1");
        assert_eq!(plan.tasks[0].name, "process_request");
        assert!(plan.tasks[0].dependencies.is_empty());
        assert!(plan.dependencies.is_empty());
        assert_eq!(plan.estimated_duration, 15);
    }

    #[test]
    fn test_medium_complexity_is_three_task_chain() {
        // development (+2) and medium scope (+1)
        let plan = plan(
            "Could you implement a small caching layer in front of the profile service?",
            "developer",
        );

        assert_eq!(plan.complexity, Complexity::Medium);
        let ids: Vec<&str> = plan.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["task_1", "task_2", "task_3"]);
        assert_eq!(plan.tasks[1].dependencies, vec!["task_1"]);
        assert_eq!(plan.tasks[2].dependencies, vec!["task_2"]);
        assert_eq!(plan.tasks[0].priority, 3);
        assert_eq!(plan.tasks[2].estimated_time, 30);
        assert_eq!(plan.tasks[2].description, "Execute implement_code for medium task");
        assert_eq!(plan.estimated_duration, 20 + 25 + 30);
        assert!(plan.required_models.contains("deepseek-coder"));
        assert!(plan.required_models.contains("codellama"));
    }

    #[test]
    fn test_high_complexity_adds_verification() {
        let message = format!(
            "We urgently need a business strategy for entering the European market. {}",
            "Cover positioning, pricing, partnerships and the hiring plan for the first year. ".repeat(3)
        );
        let plan = plan(&message, "strategist");

        assert_eq!(plan.complexity, Complexity::High);
        assert_eq!(plan.tasks.len(), 5);
        let verify = &plan.tasks[4];
        assert_eq!(verify.id, "task_5");
        assert_eq!(verify.name, "verify_results");
        assert_eq!(verify.kind, TaskKind::Verification);
        assert_eq!(verify.dependencies, vec!["task_4"]);
        assert_eq!(plan.tasks[0].priority, 4);
        assert_eq!(plan.tasks[3].estimated_time, 60);
        assert_eq!(plan.dependencies.len(), 4);
        assert!(plan.required_models.contains("gemma2"));
    }

    #[test]
    fn test_unknown_agent_uses_generic_template() {
        let plan = plan(
            "Please research how competitors price their products in this space today",
            "astrologer",
        );

        assert_eq!(plan.analysis.intent, Intent::Analysis);
        assert_eq!(plan.complexity, Complexity::Low);
        assert_eq!(plan.required_models.iter().collect::<Vec<_>>(), vec!["gemma2"]);
    }

    #[test]
    fn test_empty_message() {
        let plan = plan("", "developer");
        assert_eq!(plan.analysis.intent, Intent::GeneralQuery);
        assert_eq!(plan.analysis.scope, Scope::Simple);
        assert!(plan.analysis.entities.is_empty());
        assert_eq!(plan.tasks.len(), 1);
    }

    #[test]
    fn test_entities_are_deduplicated_in_order() {
        let entities = extract_entities("Acme and Acme again, mail ops@acme.io or ops@acme.io");
        assert_eq!(entities, vec!["ops@acme.io", "Acme"]);
    }

    #[test]
    fn test_context_relevance_and_history() {
        let mut context = Map::new();
        context.insert("company".to_string(), Value::from("Acme"));
        context.insert("product".to_string(), Value::from("rockets"));
        context.insert("seats".to_string(), Value::from(4));

        let mut session = crate::models::Session::new("s".to_string(), "developer", None, Map::new());
        for i in 0..7 {
            let role = if i % 2 == 0 { MessageRole::User } else { MessageRole::Assistant };
            session.append_message(role, &"x".repeat(60), vec![], None);
        }

        let plan = TaskPlanner::new().create_plan(
            "what does acme do with rockets",
            "developer",
            &context,
            &session.messages,
        );

        assert!((plan.analysis.context_relevance - 0.7).abs() < 1e-9);
        let patterns = &plan.analysis.history_patterns;
        assert_eq!(patterns.pattern, ConversationPattern::OngoingConversation);
        assert_eq!(patterns.frequency, 7);
        assert_eq!(patterns.recent_topics.len(), 5);
        assert_eq!(patterns.recent_topics[0].len(), 50);
        assert_eq!(patterns.avg_length, 60.0);
    }

    #[test]
    fn test_plan_ids_are_unique() {
        let planner = TaskPlanner::new();
        let a = planner.create_plan("hi", "developer", &Map::new(), &[]);
        let b = planner.create_plan("hi", "developer", &Map::new(), &[]);
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("plan_"));
    }
}
