//! Generation collaborator implementations.
//!
//! Provides concrete implementations of the `GenerationProvider` trait for:
//! - Ollama (local `/api/generate` endpoint)
//! - Hugging Face serverless inference
//!
//! Use `create_provider()` to instantiate the one selected by config. All
//! generation calls go through `with_retry` at the call site so transient
//! failures are retried with bounded exponential backoff.

pub mod hf_inference;
pub mod ollama;

use crate::config::{LlmConfig, RetryConfig};
use crate::error::GenerationError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use hf_inference::HfInferenceProvider;
pub use ollama::{OllamaEmbedder, OllamaProvider};

/// The generation collaborator boundary: one prompt in, generated text out,
/// or a typed failure. No latency guarantee beyond the configured timeout.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// The model identifier this provider talks to.
    fn model_name(&self) -> &str;
}

/// Create a generation provider based on the configuration.
///
/// - `"hf"` → `HfInferenceProvider` (Hugging Face serverless inference)
/// - everything else → `OllamaProvider` (local endpoint, no key needed)
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn GenerationProvider>, GenerationError> {
    match config.provider.as_str() {
        "hf" => Ok(Arc::new(HfInferenceProvider::new(config)?)),
        _ => Ok(Arc::new(OllamaProvider::new(config))),
    }
}

/// Execute an async generation operation with bounded exponential-backoff
/// retry on transient errors.
///
/// Retries on timeout, connection, and rate-limit errors (respecting
/// `retry_after_secs`); permanent errors (auth, parse, empty output) return
/// immediately. The attempt count is always bounded by
/// `config.max_retries`.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, GenerationError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut last_err = None;
    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !e.is_retryable() || attempt == config.max_retries {
                    return Err(e);
                }

                let backoff_ms = compute_backoff(config, attempt, &e);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Retrying generation after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(GenerationError::Connection {
        message: "all retry attempts exhausted".to_string(),
    }))
}

/// Compute backoff delay, respecting rate-limit retry-after hints.
fn compute_backoff(config: &RetryConfig, attempt: u32, err: &GenerationError) -> u64 {
    if let GenerationError::RateLimited { retry_after_secs } = err {
        let server_ms = retry_after_secs * 1000;
        return server_ms.max(compute_exponential_backoff(config, attempt));
    }
    compute_exponential_backoff(config, attempt)
}

/// Pure exponential backoff with cap and optional jitter.
fn compute_exponential_backoff(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_backoff_ms as f64) as u64;
    if config.jitter {
        // Up to 25% jitter
        let jitter = (capped as f64 * 0.25 * rand_simple()) as u64;
        capped + jitter
    } else {
        capped
    }
}

/// Simple deterministic pseudo-random for jitter (avoids pulling in rand).
fn rand_simple() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Map an HTTP status code from a generation endpoint to a typed error.
pub(crate) fn map_http_error(
    endpoint: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> GenerationError {
    match status.as_u16() {
        401 | 403 => GenerationError::AuthFailed {
            endpoint: endpoint.to_string(),
        },
        429 => GenerationError::RateLimited {
            retry_after_secs: 5,
        },
        s if s >= 500 => GenerationError::Request {
            message: format!("server error ({s}): {body}"),
        },
        s => GenerationError::Request {
            message: format!("HTTP {s}: {body}"),
        },
    }
}

/// Map a reqwest transport failure to a typed error.
pub(crate) fn map_transport_error(err: reqwest::Error, timeout_secs: u64) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout { timeout_secs }
    } else if err.is_connect() {
        GenerationError::Connection {
            message: err.to_string(),
        }
    } else {
        GenerationError::Request {
            message: err.to_string(),
        }
    }
}

/// Scripted generation provider for tests: returns queued responses in
/// order, then fails with a connection error when the script runs out.
pub struct ScriptedProvider {
    model: String,
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String, GenerationError>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            model: "scripted-model".to_string(),
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
        }
    }

    /// A provider that always returns the given text.
    pub fn with_response(text: &str) -> Self {
        let provider = Self::new();
        for _ in 0..32 {
            provider.queue(Ok(text.to_string()));
        }
        provider
    }

    /// Queue a response for the next `generate` call.
    pub fn queue(&self, response: Result<String, GenerationError>) {
        self.responses
            .lock()
            .expect("scripted provider lock poisoned")
            .push_back(response);
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.responses
            .lock()
            .expect("scripted provider lock poisoned")
            .pop_front()
            .unwrap_or(Err(GenerationError::Connection {
                message: "scripted provider exhausted".to_string(),
            }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_exponential_backoff_and_cap() {
        let config = RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 3000,
            backoff_multiplier: 2.0,
            jitter: false,
        };
        assert_eq!(compute_exponential_backoff(&config, 0), 1000);
        assert_eq!(compute_exponential_backoff(&config, 1), 2000);
        assert_eq!(compute_exponential_backoff(&config, 2), 3000); // capped
    }

    #[test]
    fn test_backoff_respects_rate_limit_hint() {
        let config = no_jitter_config(3);
        let err = GenerationError::RateLimited {
            retry_after_secs: 30,
        };
        assert_eq!(compute_backoff(&config, 0, &err), 30_000);
    }

    #[tokio::test]
    async fn test_with_retry_succeeds_first_try() {
        let config = no_jitter_config(2);
        let result = with_retry(&config, || async { Ok::<_, GenerationError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_retry_permanent_error_no_retry() {
        let config = no_jitter_config(3);
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let c = calls.clone();
        let result = with_retry(&config, || {
            let c = c.clone();
            async move {
                c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err::<i32, _>(GenerationError::EmptyOutput)
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_bounded_on_transient_error() {
        let config = no_jitter_config(2);
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let c = calls.clone();
        let result = with_retry(&config, || {
            let c = c.clone();
            async move {
                c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err::<i32, _>(GenerationError::Timeout { timeout_secs: 1 })
            }
        })
        .await;
        assert!(matches!(result, Err(GenerationError::Timeout { .. })));
        // 1 initial try + 2 retries
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_recovers_after_transient_error() {
        let config = no_jitter_config(2);
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let c = calls.clone();
        let result = with_retry(&config, || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                    Err(GenerationError::Connection {
                        message: "refused".into(),
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_scripted_provider_plays_in_order() {
        let provider = ScriptedProvider::new();
        provider.queue(Ok("first".into()));
        provider.queue(Err(GenerationError::EmptyOutput));
        assert_eq!(provider.generate("p").await.unwrap(), "first");
        assert!(matches!(
            provider.generate("p").await,
            Err(GenerationError::EmptyOutput)
        ));
        // Exhausted script fails closed
        assert!(matches!(
            provider.generate("p").await,
            Err(GenerationError::Connection { .. })
        ));
    }

    #[test]
    fn test_map_http_error() {
        let err = map_http_error("hf", reqwest::StatusCode::UNAUTHORIZED, "denied");
        assert!(matches!(err, GenerationError::AuthFailed { .. }));
        let err = map_http_error("hf", reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, GenerationError::RateLimited { .. }));
        let err = map_http_error("hf", reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, GenerationError::Request { .. }));
    }

    #[test]
    fn test_create_provider_defaults_to_ollama() {
        let config = LlmConfig::default();
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "mistral");
    }
}
