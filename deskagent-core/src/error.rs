//! Error types for the Deskagent pipeline core.
//!
//! Uses `thiserror` for public API error types, split into two domains:
//! generation-collaborator failures and pipeline-level failures. The
//! supervisor is the only place where these are converted into
//! user-visible envelope text; nothing below it formats errors for users.

/// Errors from the generation collaborator (LLM endpoint).
///
/// Transport, timeout, and rate-limit variants are retryable; auth and
/// parse variants are permanent. See `providers::with_retry`.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed: {message}")]
    Request { message: String },

    #[error("generation response parse error: {message}")]
    ResponseParse { message: String },

    #[error("generation request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("generation endpoint connection failed: {message}")]
    Connection { message: String },

    #[error("authentication failed for generation endpoint {endpoint}")]
    AuthFailed { endpoint: String },

    #[error("rate limited by generation endpoint, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("generation endpoint returned empty output")]
    EmptyOutput,
}

/// Errors from the query orchestration pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Empty or invalid caller input. Surfaced as a 4xx at the transport
    /// boundary; never produced for queries that merely have no answer.
    #[error("invalid input: {message}")]
    Input { message: String },

    /// The action extraction payload was unparsable. Unlike planner
    /// failures this is not silently defaulted: an action with no usable
    /// content must not be created. The supervisor falls back to an
    /// informational-style response.
    #[error("action extraction failed: {message}")]
    ExtractionFailed { message: String },

    /// No document is loaded; retrieval cannot run. Distinct from
    /// `NoEvidence` so the user is told to upload, not refused.
    #[error("no document loaded")]
    RetrievalUnready,

    /// Retrieval and reranking produced an empty result set.
    #[error("no evidence found for query")]
    NoEvidence,

    /// The generation collaborator failed after all retries.
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(#[from] GenerationError),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A type alias for results using the pipeline error.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl GenerationError {
    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout { .. }
                | GenerationError::Connection { .. }
                | GenerationError::RateLimited { .. }
        )
    }
}
