//! Broad-recall retrieval over the active document's vector index.
//!
//! Embeds the whole query string, runs nearest-neighbor search at the
//! configured recall width, filters "no result" sentinels (negative ids),
//! and joins hits with chunk metadata. Never pads or fabricates: a small
//! corpus simply yields fewer candidates.

use std::sync::Arc;
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::document::{DocumentStore, QueryEmbedder};
use crate::error::Result;
use crate::types::Candidate;

pub struct Retriever {
    embedder: Arc<dyn QueryEmbedder>,
    recall_width: usize,
}

impl Retriever {
    pub fn new(config: &RetrievalConfig, embedder: Arc<dyn QueryEmbedder>) -> Self {
        Self {
            embedder,
            recall_width: config.recall_width,
        }
    }

    /// Return the candidate set for a query, ordered by descending
    /// similarity, at most `recall_width` long.
    ///
    /// Readiness is the caller's responsibility: the supervisor only calls
    /// this with an active document store in hand.
    pub async fn retrieve(&self, store: &DocumentStore, query: &str) -> Result<Vec<Candidate>> {
        let embedding = self.embedder.embed(query).await?;
        let hits = store.index.search(&embedding, self.recall_width);

        let candidates: Vec<Candidate> = hits
            .into_iter()
            .filter(|(_, id)| *id >= 0)
            .filter_map(|(score, id)| {
                store.chunks.get(id as usize).map(|chunk| Candidate {
                    chunk_id: chunk.chunk_id.clone(),
                    section: chunk.section.clone(),
                    pages: chunk.pages.clone(),
                    tables: chunk.tables.clone(),
                    images: chunk.images.clone(),
                    text: chunk.text.clone(),
                    similarity: score,
                })
            })
            .collect();

        debug!(
            query_len = query.len(),
            candidates = candidates.len(),
            width = self.recall_width,
            "Broad retrieval complete"
        );
        Ok(candidates)
    }
}
