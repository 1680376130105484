// [[KERNEL]]/apps/agent-kernel/src/registry.rs
// Purpose: Agent registry. Static agent profiles and the per-agent event managers.
// Architecture: Cortex Layer
// Dependencies: DashMap, Events

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::events::EventManager;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),
    #[error("Unknown model backend: {0}")]
    UnknownModelBackend(String),
    #[error("Failed to initialise model client: {0}")]
    ClientInit(String),
}

pub const GENERAL_MODEL: &str = "gemma2";
pub const CODING_MODEL: &str = "deepseek-coder";
pub const CODING_FALLBACK_MODEL: &str = "codellama";
pub const SECURITY_MODEL: &str = "llama3.2";

/// Every model name any profile or routing rule refers to.
pub const KNOWN_MODELS: &[&str] = &[CODING_MODEL, GENERAL_MODEL, CODING_FALLBACK_MODEL, SECURITY_MODEL];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentProfile {
    pub name: &'static str,
    pub capabilities: &'static [&'static str],
    pub default_steps: &'static [&'static str],
    pub base_models: &'static [&'static str],
}

const PROFILES: &[AgentProfile] = &[
    AgentProfile {
        name: "strategist",
        capabilities: &["strategic_analysis", "market_research", "competitive_analysis", "business_planning"],
        default_steps: &["analyze_context", "identify_objectives", "develop_strategy", "create_recommendations"],
        base_models: &[CODING_MODEL, GENERAL_MODEL],
    },
    AgentProfile {
        name: "developer",
        capabilities: &["code_generation", "debugging", "architecture_design", "testing"],
        default_steps: &["understand_requirements", "design_solution", "implement_code", "test_solution"],
        base_models: &[CODING_MODEL, CODING_FALLBACK_MODEL],
    },
    AgentProfile {
        name: "content_creator",
        capabilities: &["content_writing", "seo_optimization", "social_media", "marketing_copy"],
        default_steps: &["research_topic", "create_outline", "write_content", "optimize_content"],
        base_models: &[SECURITY_MODEL, GENERAL_MODEL],
    },
    AgentProfile {
        name: "security_expert",
        capabilities: &["vulnerability_assessment", "security_analysis", "threat_modeling", "compliance"],
        default_steps: &["assess_security", "identify_threats", "recommend_mitigations", "create_plan"],
        base_models: &[CODING_MODEL, SECURITY_MODEL],
    },
];

/// Profile used for agent types without a dedicated template.
pub const GENERIC_PROFILE: AgentProfile = AgentProfile {
    name: "generic",
    capabilities: &[],
    default_steps: &["analyze", "process", "respond"],
    base_models: &[GENERAL_MODEL],
};

/// Agents that own an event log, in addition to the planning profiles above.
pub const EVENT_AGENTS: &[&str] = &[
    "strategist",
    "developer",
    "content_creator",
    "security_expert",
    "customer_success",
    "data_scientist",
    "marketing_specialist",
    "operations_manager",
    "product_manager",
    "research_analyst",
    "girlfriend",
];

pub fn profiles() -> &'static [AgentProfile] {
    PROFILES
}

pub fn profile(agent_type: &str) -> Option<&'static AgentProfile> {
    PROFILES.iter().find(|p| p.name == agent_type)
}

pub fn profile_or_generic(agent_type: &str) -> &'static AgentProfile {
    profile(agent_type).unwrap_or(&GENERIC_PROFILE)
}

pub struct AgentRegistry {
    event_managers: DashMap<String, Arc<EventManager>>,
}

impl AgentRegistry {
    pub fn new(event_history_size: usize) -> Self {
        let registry = Self {
            event_managers: DashMap::new(),
        };

        for agent in EVENT_AGENTS {
            registry.register(agent, event_history_size);
        }

        registry
    }

    pub fn register(&self, agent: &str, event_history_size: usize) {
        tracing::info!("Registering event log for agent: {}", agent);
        self.event_managers.insert(
            agent.to_string(),
            Arc::new(EventManager::new(agent, event_history_size)),
        );
    }

    pub fn event_manager(&self, agent: &str) -> Result<Arc<EventManager>, RegistryError> {
        self.event_managers
            .get(agent)
            .map(|m| m.value().clone())
            .ok_or_else(|| RegistryError::UnknownAgent(agent.to_string()))
    }

    /// Drops events older than `max_age_hours` from every agent's log.
    pub fn clear_old_events(&self, max_age_hours: i64) -> usize {
        self.event_managers
            .iter()
            .map(|m| m.value().clear_old_events(max_age_hours))
            .sum()
    }

    pub fn agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.event_managers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
