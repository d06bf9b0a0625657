//! Intent resolution: is a query informational, action-seeking, or both?
//!
//! Two strategies behind one resolver, selected by config:
//! - `Keyword`: a fixed action-keyword scan. Deterministic, no model call,
//!   implicitly maximal confidence.
//! - `Model`: a single planner generation call with a strict-JSON output
//!   contract, sanitized at the boundary.
//!
//! The resolver never fails a request. Any planner failure (transport or
//! parse) degrades to the all-default plan: INFORMATION, no action,
//! confidence 0.0 — which downstream gating treats as "do not act".

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{IntentStrategy, PlannerConfig, RetryConfig};
use crate::prompt::planner_prompt;
use crate::providers::{GenerationProvider, with_retry};
use crate::types::{ActionType, Intent, Plan};

/// Action-indicating keywords for the heuristic strategy. Matched against
/// the normalized (lower-cased) query.
const TICKET_KEYWORDS: &[&str] = &["create", "raise", "open ticket", "file ticket"];
const MEETING_KEYWORDS: &[&str] = &["schedule", "book"];

/// Resolves the plan for a query, once per request.
pub struct IntentResolver {
    strategy: IntentStrategy,
    provider: Arc<dyn GenerationProvider>,
    retry: RetryConfig,
}

impl IntentResolver {
    pub fn new(
        config: &PlannerConfig,
        provider: Arc<dyn GenerationProvider>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            strategy: config.strategy,
            provider,
            retry,
        }
    }

    /// Resolve the plan for a normalized query. Infallible by contract.
    pub async fn resolve(&self, query: &str) -> Plan {
        match self.strategy {
            IntentStrategy::Keyword => keyword_plan(query),
            IntentStrategy::Model => self.model_plan(query).await,
        }
    }

    async fn model_plan(&self, query: &str) -> Plan {
        let prompt = planner_prompt(query);
        let raw = match with_retry(&self.retry, || self.provider.generate(&prompt)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Planner generation failed; defaulting to INFORMATION");
                return Plan::information();
            }
        };

        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Planner output was not valid JSON; defaulting to INFORMATION");
                return Plan::information();
            }
        };

        let plan = sanitize_plan(&parsed);
        debug!(
            intent = ?plan.intent,
            action_type = ?plan.action_type,
            confidence = plan.confidence,
            "Resolved plan"
        );
        plan
    }
}

/// Deterministic keyword heuristic: any action keyword present means
/// ACTION at full confidence, otherwise INFORMATION.
fn keyword_plan(query: &str) -> Plan {
    let action_type = if TICKET_KEYWORDS.iter().any(|kw| query.contains(kw)) {
        Some(ActionType::CreateTicket)
    } else if MEETING_KEYWORDS.iter().any(|kw| query.contains(kw)) {
        Some(ActionType::ScheduleMeeting)
    } else {
        None
    };

    match action_type {
        Some(action_type) => Plan {
            intent: Intent::Action,
            action_type: Some(action_type),
            confidence: 1.0,
        },
        None => Plan {
            intent: Intent::Information,
            action_type: None,
            confidence: 1.0,
        },
    }
}

/// Clamp raw planner JSON into a valid `Plan`. Every field defaults
/// independently, so one bad field never poisons the others.
fn sanitize_plan(raw: &Value) -> Plan {
    let intent = raw
        .get("intent")
        .cloned()
        .and_then(|v| serde_json::from_value::<Intent>(v).ok())
        .unwrap_or(Intent::Information);

    let action_type = raw
        .get("action_type")
        .cloned()
        .and_then(|v| serde_json::from_value::<ActionType>(v).ok());

    let confidence = parse_confidence(raw.get("confidence"));

    Plan {
        intent,
        action_type,
        confidence,
    }
}

/// Parse confidence as a float (numbers and numeric strings both count),
/// clamped to [0, 1]; anything else defaults to 0.0.
fn parse_confidence(raw: Option<&Value>) -> f32 {
    let value = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0) as f32,
        _ => 0.0,
    }
}
