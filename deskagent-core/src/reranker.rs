//! Precision reranking of the broad candidate set.
//!
//! Each (query, candidate) pair is scored independently by a pairwise
//! relevance model behind the `PairwiseScorer` seam, then candidates are
//! re-sorted descending by that score and truncated to top-K. The sort is
//! stable, so exact score ties keep their retrieval order; randomized
//! tie-breaking is disallowed for reproducibility.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::types::{Candidate, RankedResult};

/// A pairwise relevance model: score one (query, passage) pair.
/// Higher is more relevant; the scale is model-defined.
#[async_trait]
pub trait PairwiseScorer: Send + Sync {
    async fn score(&self, query: &str, passage: &str) -> Result<f32>;
}

/// Token-overlap scorer: the fraction of query tokens present in the
/// passage. Deterministic and model-free; the default stand-in when no
/// cross-encoder endpoint is configured.
pub struct LexicalOverlapScorer;

#[async_trait]
impl PairwiseScorer for LexicalOverlapScorer {
    async fn score(&self, query: &str, passage: &str) -> Result<f32> {
        let passage = passage.to_lowercase();
        let tokens: Vec<&str> = query.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(0.0);
        }
        let hits = tokens
            .iter()
            .filter(|t| passage.contains(&t.to_lowercase()))
            .count();
        Ok(hits as f32 / tokens.len() as f32)
    }
}

pub struct Reranker {
    scorer: Arc<dyn PairwiseScorer>,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn PairwiseScorer>) -> Self {
        Self { scorer }
    }

    /// Re-score and re-order candidates, returning the top `top_k`.
    /// Empty input yields empty output, no error.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> Result<Vec<RankedResult>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut ranked = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            // Same pair text the original cross-encoder saw: section + body.
            let passage = format!("{}: {}", candidate.section, candidate.text);
            let rerank_score = self.scorer.score(query, &passage).await?;
            ranked.push(RankedResult {
                candidate,
                rerank_score,
            });
        }

        // Stable sort: ties keep retrieval (similarity) order.
        ranked.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_k);

        debug!(kept = ranked.len(), top_k = top_k, "Reranking complete");
        Ok(ranked)
    }
}
