//! The supervisor: top-level orchestration state machine for one query.
//!
//! NORMALIZE -> RESOLVE_INTENT -> {RAG | ACTION | RAG_THEN_ACTION} -> RESPOND.
//!
//! Every collaborator is dependency-injected at construction; the only
//! shared mutable state is the active-document triple, swapped wholesale
//! on upload behind a read/write guard so queries always see a consistent
//! (index, metadata, tables) unit.
//!
//! Failure policy at this level: internal errors never reach the caller
//! unformatted. Generation failures become the "temporarily unavailable"
//! notice, a missing document becomes the upload prompt, and an empty
//! evidence set becomes the canonical refusal.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::action::ActionExtractor;
use crate::config::DeskConfig;
use crate::context::build_context;
use crate::document::{DocumentStore, QueryEmbedder};
use crate::error::{PipelineError, Result};
use crate::normalize::normalize;
use crate::planner::IntentResolver;
use crate::prompt::answer_prompt;
use crate::providers::{GenerationProvider, with_retry};
use crate::reranker::{PairwiseScorer, Reranker};
use crate::retriever::Retriever;
use crate::types::{
    NO_DOCUMENT_TEXT, Plan, REFUSAL_TEXT, ResponseEnvelope, UNAVAILABLE_TEXT,
};

pub struct Supervisor {
    resolver: IntentResolver,
    retriever: Retriever,
    reranker: Reranker,
    extractor: ActionExtractor,
    provider: Arc<dyn GenerationProvider>,
    config: DeskConfig,
    document: RwLock<Option<Arc<DocumentStore>>>,
}

impl Supervisor {
    /// Single initialization point: all collaborators are handed in here,
    /// never looked up from ambient globals.
    pub fn new(
        config: DeskConfig,
        provider: Arc<dyn GenerationProvider>,
        embedder: Arc<dyn QueryEmbedder>,
        scorer: Arc<dyn PairwiseScorer>,
    ) -> Self {
        let resolver = IntentResolver::new(&config.planner, provider.clone(), config.llm.retry.clone());
        let retriever = Retriever::new(&config.retrieval, embedder);
        let reranker = Reranker::new(scorer);
        let extractor = ActionExtractor::new(&config.action, provider.clone(), config.llm.retry.clone());

        Self {
            resolver,
            retriever,
            reranker,
            extractor,
            provider,
            config,
            document: RwLock::new(None),
        }
    }

    /// Replace the active document as one unit.
    pub async fn install_document(&self, store: DocumentStore) {
        let mut guard = self.document.write().await;
        info!(store = ?store, "Installing new active document");
        *guard = Some(Arc::new(store));
    }

    /// Whether a document is currently loaded.
    pub async fn has_document(&self) -> bool {
        self.document.read().await.is_some()
    }

    /// Handle one query end to end.
    ///
    /// The only error surfaced to the transport layer is `Input` for an
    /// empty query; every other failure is folded into a user-facing
    /// envelope here.
    pub async fn handle(&self, raw_query: &str) -> Result<ResponseEnvelope> {
        let query = normalize(raw_query);
        if query.is_empty() {
            return Err(PipelineError::Input {
                message: "empty query".to_string(),
            });
        }

        let plan = self.resolver.resolve(&query).await;

        let act = if plan.intent.wants_action() {
            if plan.confidence >= self.config.planner.confidence_threshold {
                true
            } else {
                // Sub-threshold action intent downgrades silently to RAG.
                info!(
                    confidence = plan.confidence,
                    threshold = self.config.planner.confidence_threshold,
                    "Action intent below confidence threshold; downgrading to retrieval"
                );
                false
            }
        } else {
            false
        };
        let inform = plan.intent.wants_information() || !act;

        // Retrieval works on the normalized form; action extraction gets
        // the caller's original text so ticket descriptions keep their
        // casing.
        match (inform, act) {
            (true, false) => Ok(self.run_rag_or_notice(&query).await),
            (false, true) => Ok(self.run_action_or_notice(&plan, raw_query).await),
            (true, true) => {
                let information = self.run_rag_or_notice(&query).await;
                match self.extractor.build_action(&plan, raw_query).await {
                    Ok(action) => match information {
                        ResponseEnvelope::Information { answer, page, .. } => {
                            Ok(ResponseEnvelope::InformationAndAction {
                                answer,
                                page,
                                action,
                            })
                        }
                        other => Ok(other),
                    },
                    Err(e) => {
                        // Keep the grounded answer; the action half just
                        // degrades away.
                        warn!(error = %e, "Action extraction failed; returning information only");
                        Ok(information)
                    }
                }
            }
            // Exhaustive enum routing makes the refusal row of the table
            // structurally unreachable.
            (false, false) => Ok(ResponseEnvelope::refusal()),
        }
    }

    async fn run_action_or_notice(&self, plan: &Plan, query: &str) -> ResponseEnvelope {
        match self.extractor.build_action(plan, query).await {
            Ok(action) => ResponseEnvelope::Action { action },
            Err(e) => {
                warn!(error = %e, "Action path failed; responding unavailable");
                ResponseEnvelope::notice(UNAVAILABLE_TEXT)
            }
        }
    }

    async fn run_rag_or_notice(&self, query: &str) -> ResponseEnvelope {
        match self.run_rag(query).await {
            Ok(envelope) => envelope,
            Err(PipelineError::RetrievalUnready) => ResponseEnvelope::notice(NO_DOCUMENT_TEXT),
            Err(PipelineError::NoEvidence) => ResponseEnvelope::refusal(),
            Err(e) => {
                warn!(error = %e, "RAG path failed; responding unavailable");
                ResponseEnvelope::notice(UNAVAILABLE_TEXT)
            }
        }
    }

    /// The RAG sub-procedure: retrieve -> rerank -> assemble -> generate.
    async fn run_rag(&self, query: &str) -> Result<ResponseEnvelope> {
        // Clone the Arc out so the lock is not held across model calls.
        let store = {
            let guard = self.document.read().await;
            guard.clone().ok_or(PipelineError::RetrievalUnready)?
        };

        let candidates = self.retriever.retrieve(&store, query).await?;
        let ranked = self
            .reranker
            .rerank(query, candidates, self.config.retrieval.top_k)
            .await?;
        if ranked.is_empty() {
            return Err(PipelineError::NoEvidence);
        }

        let context = build_context(&ranked);
        let tables = context
            .top()
            .map(|top| store.render_tables(&top.tables))
            .unwrap_or_default();
        let prompt = answer_prompt(query, &context, &tables);

        let answer = with_retry(&self.config.llm.retry, || self.provider.generate(&prompt)).await?;

        if answer.trim() == REFUSAL_TEXT {
            return Ok(ResponseEnvelope::refusal());
        }

        let top = &ranked[0];
        Ok(ResponseEnvelope::Information {
            answer,
            page: top.candidate.pages.first().copied(),
            context_score: Some(top.rerank_score),
        })
    }
}
