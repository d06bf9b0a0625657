//! Configuration system for Deskagent.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! environment. Environment variables are prefixed with `DESKAGENT_` and
//! use `__` as the section separator (`DESKAGENT_LLM__MODEL`,
//! `DESKAGENT_PLANNER__CONFIDENCE_THRESHOLD`, ...).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PipelineError;
use crate::types::Priority;

/// Top-level configuration for the Deskagent pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeskConfig {
    pub llm: LlmConfig,
    pub planner: PlannerConfig,
    pub retrieval: RetrievalConfig,
    pub action: ActionConfig,
    pub server: ServerConfig,
}

/// Generation collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Which provider to use: `"ollama"` or `"hf"`.
    pub provider: String,
    /// Model identifier passed to the endpoint.
    pub model: String,
    /// Embedding model used for query embeddings (Ollama embeddings API).
    pub embed_model: String,
    /// Base URL for local endpoints (Ollama). Ignored by the HF provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable holding the API token (HF provider).
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Cap on generated tokens.
    pub max_new_tokens: u32,
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "mistral".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            base_url: Some("http://localhost:11434".to_string()),
            api_key_env: "HF_TOKEN".to_string(),
            timeout_secs: 60,
            max_new_tokens: 256,
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded retry policy for generation calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Intent resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStrategy {
    /// Fixed action-keyword scan, no model call.
    Keyword,
    /// Single planner generation call with strict-JSON output.
    Model,
}

/// Intent resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub strategy: IntentStrategy,
    /// Minimum planner confidence required to execute an action instead of
    /// deferring to information retrieval.
    pub confidence_threshold: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            strategy: IntentStrategy::Model,
            confidence_threshold: 0.6,
        }
    }
}

/// Retrieval and reranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Broad candidate-set width for the recall stage.
    pub recall_width: usize,
    /// Precision top-K kept after reranking.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            recall_width: 25,
            top_k: 5,
        }
    }
}

/// Which ticket-priority vocabulary the action schema accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrioritySchema {
    /// `High | Normal`, baseline `Normal`.
    HighNormal,
    /// `Low | Medium | High`, baseline `Medium`.
    LowMediumHigh,
}

impl PrioritySchema {
    /// Whether the schema accepts the given priority.
    pub fn allows(&self, priority: Priority) -> bool {
        match self {
            PrioritySchema::HighNormal => {
                matches!(priority, Priority::High | Priority::Normal)
            }
            PrioritySchema::LowMediumHigh => {
                matches!(priority, Priority::Low | Priority::Medium | Priority::High)
            }
        }
    }

    /// The default used when the model emits an out-of-vocabulary priority.
    pub fn baseline(&self) -> Priority {
        match self {
            PrioritySchema::HighNormal => Priority::Normal,
            PrioritySchema::LowMediumHigh => Priority::Medium,
        }
    }

    /// The vocabulary string embedded in the extraction prompt.
    pub fn prompt_vocabulary(&self) -> &'static str {
        match self {
            PrioritySchema::HighNormal => "High | Normal",
            PrioritySchema::LowMediumHigh => "Low | Medium | High",
        }
    }
}

/// Action extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Owning department stamped on every extracted action.
    pub department: String,
    pub priority_schema: PrioritySchema,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            department: "IT".to_string(),
            priority_schema: PrioritySchema::HighNormal,
        }
    }
}

/// HTTP surface configuration (used by the server binary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Upload size cap in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8501".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `DESKAGENT_`)
/// 2. The given config file, if any
/// 3. Built-in defaults
pub fn load_config(config_path: Option<&Path>) -> Result<DeskConfig, PipelineError> {
    let mut figment = Figment::from(Serialized::defaults(DeskConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("DESKAGENT_").split("__"));

    figment.extract().map_err(|e| PipelineError::Config {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = DeskConfig::default();
        assert_eq!(config.retrieval.recall_width, 25);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.planner.confidence_threshold, 0.6);
        assert_eq!(config.planner.strategy, IntentStrategy::Model);
        assert_eq!(config.action.department, "IT");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.llm.retry.max_retries, 2);
    }

    #[test]
    fn test_priority_schema_high_normal() {
        let schema = PrioritySchema::HighNormal;
        assert!(schema.allows(Priority::High));
        assert!(schema.allows(Priority::Normal));
        assert!(!schema.allows(Priority::Medium));
        assert!(!schema.allows(Priority::Low));
        assert_eq!(schema.baseline(), Priority::Normal);
    }

    #[test]
    fn test_priority_schema_low_medium_high() {
        let schema = PrioritySchema::LowMediumHigh;
        assert!(schema.allows(Priority::Low));
        assert!(schema.allows(Priority::Medium));
        assert!(schema.allows(Priority::High));
        assert!(!schema.allows(Priority::Normal));
        assert_eq!(schema.baseline(), Priority::Medium);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deskagent.toml");
        std::fs::write(
            &path,
            r#"
[planner]
strategy = "keyword"
confidence_threshold = 0.75

[retrieval]
recall_width = 10
top_k = 3
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.planner.strategy, IntentStrategy::Keyword);
        assert_eq!(config.planner.confidence_threshold, 0.75);
        assert_eq!(config.retrieval.recall_width, 10);
        assert_eq!(config.retrieval.top_k, 3);
        // Untouched sections keep defaults
        assert_eq!(config.action.department, "IT");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.retrieval.recall_width, 25);
    }
}
