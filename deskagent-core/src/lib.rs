//! # Deskagent Core
//!
//! Query orchestration pipeline for document-grounded question answering
//! and action dispatch: intent planning, two-stage retrieval (broad recall
//! plus precision rerank), grounded-context assembly, structured action
//! extraction, and the supervisor state machine that ties them together.
//!
//! Document ingestion, the embedding model, and the generation endpoints
//! are external collaborators reached through the traits in [`document`]
//! and [`providers`].

pub mod action;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod normalize;
pub mod planner;
pub mod prompt;
pub mod providers;
pub mod reranker;
pub mod retriever;
pub mod supervisor;
pub mod types;

// Re-export commonly used types at the crate root.
pub use action::ActionExtractor;
pub use config::{DeskConfig, IntentStrategy, PrioritySchema, RetryConfig, load_config};
pub use document::{ChunkRecord, DocumentStore, FlatIndex, QueryEmbedder, TableRecord, VectorIndex};
pub use error::{GenerationError, PipelineError, Result};
pub use normalize::normalize;
pub use planner::IntentResolver;
pub use providers::{
    GenerationProvider, OllamaEmbedder, ScriptedProvider, create_provider, with_retry,
};
pub use reranker::{LexicalOverlapScorer, PairwiseScorer, Reranker};
pub use retriever::Retriever;
pub use supervisor::Supervisor;
pub use types::{
    Action, ActionType, Candidate, ContextPayload, EvidenceItem, Intent, NO_DOCUMENT_TEXT, Plan,
    Priority, REFUSAL_TEXT, RankedResult, ResponseEnvelope, UNAVAILABLE_TEXT,
};
