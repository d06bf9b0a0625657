//! The active document: chunk metadata, raw tables, and the vector index.
//!
//! The ingestion subsystem (external to this crate) produces all three as
//! one unit. They are swapped wholesale when a new document is uploaded and
//! are read-only during query handling, so readers always observe a
//! consistent (index, metadata, tables) triple.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Metadata for one ingested text chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
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
}

/// A raw table payload from ingestion. Structured tables carry HTML;
/// everything else falls back to raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl TableRecord {
    /// Render the table for prompt inclusion. Returns `None` when the
    /// record carries neither an HTML body nor raw text.
    pub fn render(&self) -> Option<String> {
        if self.table_type.as_deref() == Some("structured")
            && let Some(html) = &self.table_html
        {
            return Some(format!("[STRUCTURED TABLE]\n{html}"));
        }
        self.raw_text
            .as_ref()
            .map(|raw| format!("[UNSTRUCTURED TABLE]\n{raw}"))
    }
}

/// Nearest-neighbor search over the document's chunk embeddings.
///
/// Implementations may return fewer than `k` hits for a small corpus and
/// may emit negative-id "no result" sentinels; callers filter those.
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` `(score, id)` pairs, best first.
    fn search(&self, embedding: &[f32], k: usize) -> Vec<(f32, i64)>;

    /// Number of vectors in the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The external embedding model boundary: one query string in, one
/// embedding out.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GenerationError>;
}

/// The atomically-swapped active-document triple.
pub struct DocumentStore {
    pub index: Box<dyn VectorIndex>,
    pub chunks: Vec<ChunkRecord>,
    pub tables: Vec<TableRecord>,
}

impl DocumentStore {
    pub fn new(
        index: Box<dyn VectorIndex>,
        chunks: Vec<ChunkRecord>,
        tables: Vec<TableRecord>,
    ) -> Self {
        Self {
            index,
            chunks,
            tables,
        }
    }

    /// Render every referenced table that exists in this document,
    /// preserving the order of `table_ids`.
    pub fn render_tables(&self, table_ids: &[String]) -> Vec<String> {
        table_ids
            .iter()
            .filter_map(|id| self.tables.iter().find(|t| &t.id == id))
            .filter_map(TableRecord::render)
            .collect()
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("vectors", &self.index.len())
            .field("chunks", &self.chunks.len())
            .field("tables", &self.tables.len())
            .finish()
    }
}

/// Brute-force cosine index over pre-normalized embeddings.
///
/// The reference implementation of [`VectorIndex`]; ingestion normally
/// hands over a ready-built index, but this one backs tests and small
/// local corpora.
pub struct FlatIndex {
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Build from raw vectors, L2-normalizing each so the inner product
    /// below is cosine similarity.
    pub fn new(vectors: Vec<Vec<f32>>) -> Self {
        let vectors = vectors
            .into_iter()
            .map(|v| {
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    v.iter().map(|x| x / norm).collect()
                } else {
                    v
                }
            })
            .collect();
        Self { vectors }
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, embedding: &[f32], k: usize) -> Vec<(f32, i64)> {
        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        let query: Vec<f32> = if norm > 0.0 {
            embedding.iter().map(|x| x / norm).collect()
        } else {
            embedding.to_vec()
        };

        let mut scored: Vec<(f32, i64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let dot = v.iter().zip(&query).map(|(a, b)| a * b).sum::<f32>();
                (dot, i as i64)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}
