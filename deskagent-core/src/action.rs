//! Structured action extraction.
//!
//! Converts a free-form action request into a complete, schema-conformant
//! `Action`. Field-level problems are clamped to safe defaults, but a
//! top-level parse failure is a hard `ExtractionFailed`: unlike the
//! planner, an action with no usable content must not be silently created.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::{ActionConfig, PrioritySchema, RetryConfig};
use crate::error::{PipelineError, Result};
use crate::prompt::extraction_prompt;
use crate::providers::{GenerationProvider, with_retry};
use crate::types::{Action, ActionType, Plan, Priority};

/// The raw extraction payload, parsed at the model boundary.
#[derive(Debug, Deserialize)]
struct ActionDraft {
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    affected_user: Option<String>,
    #[serde(default)]
    issue: Option<String>,
}

pub struct ActionExtractor {
    provider: Arc<dyn GenerationProvider>,
    retry: RetryConfig,
    department: String,
    schema: PrioritySchema,
}

impl ActionExtractor {
    pub fn new(
        config: &ActionConfig,
        provider: Arc<dyn GenerationProvider>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            retry,
            department: config.department.clone(),
            schema: config.priority_schema,
        }
    }

    /// Extract a validated action from the raw query.
    ///
    /// Errors: `GenerationUnavailable` when the model endpoint fails,
    /// `ExtractionFailed` when its output is not parseable JSON. Callers
    /// catch both and fall back to an informational-style response.
    pub async fn build_action(&self, plan: &Plan, raw_query: &str) -> Result<Action> {
        let prompt = extraction_prompt(raw_query, self.schema);
        let raw = with_retry(&self.retry, || self.provider.generate(&prompt)).await?;

        let parsed: Value =
            serde_json::from_str(&raw).map_err(|e| PipelineError::ExtractionFailed {
                message: format!("extraction output was not valid JSON: {e}"),
            })?;
        let draft: ActionDraft =
            serde_json::from_value(parsed).map_err(|e| PipelineError::ExtractionFailed {
                message: format!("extraction output had the wrong shape: {e}"),
            })?;

        let priority = draft
            .priority
            .as_deref()
            .and_then(parse_priority)
            .filter(|p| self.schema.allows(*p))
            .unwrap_or_else(|| self.schema.baseline());

        let description = match draft.issue {
            Some(issue) if !issue.trim().is_empty() => issue,
            _ => raw_query.to_string(),
        };

        let action = Action {
            action: plan.action_type.unwrap_or(ActionType::CreateTicket),
            department: self.department.clone(),
            priority,
            description,
            affected_user: draft.affected_user,
        };
        debug!(action = %action.action, priority = %action.priority, "Extracted action");
        Ok(action)
    }
}

/// Parse a priority label, tolerating casing differences.
fn parse_priority(raw: &str) -> Option<Priority> {
    let raw = raw.trim();
    for priority in [
        Priority::Low,
        Priority::Medium,
        Priority::Normal,
        Priority::High,
    ] {
        if raw.eq_ignore_ascii_case(&priority.to_string()) {
            return Some(priority);
        }
    }
    None
}
