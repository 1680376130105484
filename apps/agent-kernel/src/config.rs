// [[KERNEL]]/apps/agent-kernel/src/config.rs
// Purpose: Runtime configuration resolved from environment variables.
// Architecture: Application Boot
// Dependencies: std::env

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::executor::ExecutorConfig;
use crate::memory::MemoryConfig;

#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub port: u16,
    pub storage_path: PathBuf,
    pub model_backend: String,
    pub ollama_base_url: String,
    pub event_history_size: usize,
    pub cleanup_interval: Duration,
    pub executor: ExecutorConfig,
    pub memory: MemoryConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            storage_path: PathBuf::from("data/memory"),
            model_backend: "canned".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            event_history_size: 1000,
            cleanup_interval: Duration::from_secs(300),
            executor: ExecutorConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl KernelConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let task_timeout = parse_or(&lookup, "TASK_TIMEOUT_SECS", 0u64);
        let executor = ExecutorConfig {
            propagate_on_failure: parse_or(
                &lookup,
                "PROPAGATE_ON_FAILURE",
                defaults.executor.propagate_on_failure,
            ),
            task_timeout: (task_timeout > 0).then(|| Duration::from_secs(task_timeout)),
            ..defaults.executor
        };

        let memory = MemoryConfig {
            max_session_age_hours: parse_or(
                &lookup,
                "MAX_SESSION_AGE_HOURS",
                defaults.memory.max_session_age_hours,
            ),
            max_short_term_items: parse_or(
                &lookup,
                "MAX_SHORT_TERM_ITEMS",
                defaults.memory.max_short_term_items,
            ),
            ..defaults.memory
        };

        Self {
            port: parse_or(&lookup, "KERNEL_PORT", defaults.port),
            storage_path: lookup("MEMORY_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            model_backend: lookup("MODEL_BACKEND").unwrap_or(defaults.model_backend),
            ollama_base_url: lookup("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            event_history_size: parse_or(&lookup, "EVENT_HISTORY_SIZE", defaults.event_history_size),
            cleanup_interval: Duration::from_secs(parse_or(
                &lookup,
                "MEMORY_CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval.as_secs(),
            )
            .max(1)),
            executor,
            memory,
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: '{}'", key, raw);
                default
            }
        },
        None => default,
    }
}
