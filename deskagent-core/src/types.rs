//! Core type definitions for the Deskagent pipeline.
//!
//! Everything here is request-scoped: a `Plan` is produced once per query
//! and never mutated, candidates and ranked results are discarded after
//! the envelope is built, and only the externally-owned document store
//! outlives a request.

use serde::{Deserialize, Serialize};

/// Canonical refusal sentence returned when no adequate evidence exists.
pub const REFUSAL_TEXT: &str = "Information not found in the document.";

/// Returned when no document has been ingested yet.
pub const NO_DOCUMENT_TEXT: &str = "Please upload a PDF first.";

/// Returned when the generation collaborator is unreachable or failing.
pub const UNAVAILABLE_TEXT: &str =
    "The assistant is temporarily unavailable. Please try again later.";

/// Resolved query intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Information,
    Action,
    InformationAndAction,
}

impl Intent {
    /// Whether this intent requests an action.
    pub fn wants_action(&self) -> bool {
        matches!(self, Intent::Action | Intent::InformationAndAction)
    }

    /// Whether this intent requests information retrieval.
    pub fn wants_information(&self) -> bool {
        matches!(self, Intent::Information | Intent::InformationAndAction)
    }
}

/// Supported structured actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    CreateTicket,
    ScheduleMeeting,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::CreateTicket => write!(f, "create_ticket"),
            ActionType::ScheduleMeeting => write!(f, "schedule_meeting"),
        }
    }
}

/// The plan produced by the intent resolver. Produced once per query,
/// sanitized at creation, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub intent: Intent,
    pub action_type: Option<ActionType>,
    /// Certainty of ACTION intent, clamped to [0, 1].
    pub confidence: f32,
}

impl Plan {
    /// The all-default plan used when the planner output is unusable.
    pub fn information() -> Self {
        Self {
            intent: Intent::Information,
            action_type: None,
            confidence: 0.0,
        }
    }
}

/// A chunk returned by broad vector retrieval, ordered by descending
/// similarity within its candidate set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub chunk_id: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub pages: Vec<u32>,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub text: String,
    /// Cosine similarity reported by the vector index.
    pub similarity: f32,
}

/// A candidate augmented with a pairwise relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub rerank_score: f32,
}

/// One evidence item in the grounded context payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub section: String,
    pub pages: Vec<u32>,
    pub text: String,
    pub tables: Vec<String>,
    pub images: Vec<String>,
}

/// The assembled evidence payload. This is the only document content a
/// generation prompt may be built from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextPayload {
    pub items: Vec<EvidenceItem>,
}

impl ContextPayload {
    /// The top-ranked evidence item, if any.
    pub fn top(&self) -> Option<&EvidenceItem> {
        self.items.first()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ticket priority. Which subset is permitted depends on the configured
/// schema; clamping happens in the action extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    Normal,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Normal => write!(f, "Normal"),
            Priority::High => write!(f, "High"),
        }
    }
}

/// A validated, fully-populated structured action. Never partially
/// populated: every field has a clamped or defaulted value by the time
/// this struct exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action: ActionType,
    pub department: String,
    pub priority: Priority,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_user: Option<String>,
}

/// The caller-facing result of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseEnvelope {
    Information {
        answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context_score: Option<f32>,
    },
    Action {
        #[serde(flatten)]
        action: Action,
    },
    InformationAndAction {
        answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page: Option<u32>,
        action: Action,
    },
}

impl ResponseEnvelope {
    /// An informational envelope with no page attribution.
    pub fn notice(answer: impl Into<String>) -> Self {
        ResponseEnvelope::Information {
            answer: answer.into(),
            page: None,
            context_score: None,
        }
    }

    /// The canonical refusal envelope.
    pub fn refusal() -> Self {
        Self::notice(REFUSAL_TEXT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_intent_serde_screaming_snake() {
        let json = serde_json::to_string(&Intent::InformationAndAction).unwrap();
        assert_eq!(json, "\"INFORMATION_AND_ACTION\"");
        let back: Intent = serde_json::from_str("\"ACTION\"").unwrap();
        assert_eq!(back, Intent::Action);
    }

    #[test]
    fn test_action_type_serde_snake() {
        let json = serde_json::to_string(&ActionType::CreateTicket).unwrap();
        assert_eq!(json, "\"create_ticket\"");
        assert_eq!(ActionType::ScheduleMeeting.to_string(), "schedule_meeting");
    }

    #[test]
    fn test_intent_routing_helpers() {
        assert!(Intent::Action.wants_action());
        assert!(Intent::InformationAndAction.wants_action());
        assert!(!Intent::Information.wants_action());
        assert!(Intent::Information.wants_information());
        assert!(Intent::InformationAndAction.wants_information());
        assert!(!Intent::Action.wants_information());
    }

    #[test]
    fn test_default_plan() {
        let plan = Plan::information();
        assert_eq!(plan.intent, Intent::Information);
        assert_eq!(plan.action_type, None);
        assert_eq!(plan.confidence, 0.0);
    }

    #[test]
    fn test_envelope_tagging() {
        let env = ResponseEnvelope::Information {
            answer: "Revenue was $1.2B".into(),
            page: Some(14),
            context_score: None,
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "information");
        assert_eq!(json["page"], 14);

        let env = ResponseEnvelope::Action {
            action: Action {
                action: ActionType::CreateTicket,
                department: "IT".into(),
                priority: Priority::High,
                description: "VPN is broken".into(),
                affected_user: None,
            },
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "action");
        assert_eq!(json["action"], "create_ticket");
        assert_eq!(json["priority"], "High");
        assert!(json.get("affected_user").is_none());
    }

    #[test]
    fn test_refusal_envelope_text() {
        let env = ResponseEnvelope::refusal();
        match env {
            ResponseEnvelope::Information { answer, page, .. } => {
                assert_eq!(answer, REFUSAL_TEXT);
                assert_eq!(page, None);
            }
            other => panic!("expected information envelope, got {other:?}"),
        }
    }
}
