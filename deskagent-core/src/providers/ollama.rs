//! Ollama generation provider.
//!
//! Talks to a local Ollama daemon via `POST {base_url}/api/generate` with
//! streaming disabled. No API key is required for local endpoints.

use crate::config::LlmConfig;
use crate::error::GenerationError;
use crate::providers::{GenerationProvider, map_http_error, map_transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url,
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.1,
                "top_p": 0.9,
            },
        });

        debug!(url = %url, model = %self.model, "Sending Ollama generation request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        if !status.is_success() {
            return Err(map_http_error("ollama", status, &response_body));
        }

        let parsed: Value =
            serde_json::from_str(&response_body).map_err(|e| GenerationError::ResponseParse {
                message: format!("invalid JSON: {e}"),
            })?;

        let text = parsed
            .get("response")
            .and_then(|r| r.as_str())
            .map(str::trim)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::EmptyOutput);
        }
        Ok(text.to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Query embedder backed by the Ollama embeddings API
/// (`POST {base_url}/api/embeddings`).
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaEmbedder {
    pub fn new(config: &LlmConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url,
            model: config.embed_model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl crate::document::QueryEmbedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GenerationError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = json!({ "model": self.model, "prompt": text });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        if !status.is_success() {
            return Err(map_http_error("ollama", status, &response_body));
        }

        let parsed: Value =
            serde_json::from_str(&response_body).map_err(|e| GenerationError::ResponseParse {
                message: format!("invalid JSON: {e}"),
            })?;

        let embedding: Vec<f32> = parsed
            .get("embedding")
            .and_then(Value::as_array)
            .map(|xs| {
                xs.iter()
                    .filter_map(Value::as_f64)
                    .map(|x| x as f32)
                    .collect()
            })
            .unwrap_or_default();

        if embedding.is_empty() {
            return Err(GenerationError::ResponseParse {
                message: "embeddings response carried no embedding".to_string(),
            });
        }
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OllamaProvider {
        OllamaProvider::new(&LlmConfig::default())
    }

    #[test]
    fn test_default_base_url() {
        let mut config = LlmConfig::default();
        config.base_url = None;
        let p = OllamaProvider::new(&config);
        assert_eq!(p.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_model_name() {
        assert_eq!(provider().model_name(), "mistral");
    }
}
