//! Hugging Face serverless inference provider.
//!
//! `POST https://api-inference.huggingface.co/models/{model}` with a bearer
//! token. The endpoint returns either a JSON object or a one-element array
//! carrying `generated_text` (or `summary_text` for summarization models);
//! an `error` field anywhere in the payload is a typed failure.

use crate::config::LlmConfig;
use crate::error::GenerationError;
use crate::providers::{GenerationProvider, map_http_error, map_transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const HF_BASE_URL: &str = "https://api-inference.huggingface.co/models";

pub struct HfInferenceProvider {
    client: Client,
    url: String,
    api_token: String,
    model: String,
    max_new_tokens: u32,
    timeout_secs: u64,
}

impl HfInferenceProvider {
    /// Create a provider, resolving the API token from the configured
    /// environment variable. A missing token is an auth failure up front
    /// rather than a surprise on the first request.
    pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
        let api_token =
            std::env::var(&config.api_key_env).map_err(|_| GenerationError::AuthFailed {
                endpoint: format!("hf: env var '{}' not set", config.api_key_env),
            })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Ok(Self {
            client,
            url: format!("{HF_BASE_URL}/{}", config.model),
            api_token,
            model: config.model.clone(),
            max_new_tokens: config.max_new_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Pull generated text out of the HF payload, which may be an object
    /// or a one-element array of objects.
    fn extract_text(payload: &Value) -> Result<String, GenerationError> {
        let object = match payload {
            Value::Array(items) => items.first(),
            Value::Object(_) => Some(payload),
            _ => None,
        };

        let Some(object) = object else {
            return Err(GenerationError::ResponseParse {
                message: "unexpected HF response shape".to_string(),
            });
        };

        if let Some(error) = object.get("error") {
            return Err(GenerationError::Request {
                message: format!("HF inference error: {error}"),
            });
        }

        for field in ["generated_text", "summary_text"] {
            if let Some(text) = object.get(field).and_then(|t| t.as_str()) {
                let text = text.trim();
                if !text.is_empty() {
                    return Ok(text.to_string());
                }
            }
        }

        Err(GenerationError::EmptyOutput)
    }
}

#[async_trait]
impl GenerationProvider for HfInferenceProvider {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.max_new_tokens,
                "temperature": 0.1,
                "top_p": 0.9,
                "return_full_text": false,
            },
        });

        debug!(url = %self.url, model = %self.model, "Sending HF inference request");

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_token))
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
            return Err(map_http_error("hf", status, &response_body));
        }

        let parsed: Value =
            serde_json::from_str(&response_body).map_err(|e| GenerationError::ResponseParse {
                message: format!("invalid JSON: {e}"),
            })?;

        Self::extract_text(&parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
