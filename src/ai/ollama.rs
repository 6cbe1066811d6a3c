//! Ollama HTTP client
//!
//! Talks to the `/api/generate` endpoint with streaming disabled and probes
//! `/api/tags` for health.

use super::client::TextGenerator;
use super::error::BackendError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default request timeout for generation calls
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

pub const DEFAULT_MODEL: &str = "qwen2.5-coder:7b";

/// Ollama client, safe to share across tasks behind an `Arc`
pub struct OllamaClient {
    endpoint: String,
    model: String,
    /// Shared HTTP client with connection pooling
    http_client: Client,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_timeout(endpoint, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::ConfigurationError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http_client,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::TimeoutError {
                seconds: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            BackendError::NetworkError {
                message: format!("Cannot connect to {}: {}", self.endpoint, e),
            }
        } else {
            BackendError::NetworkError {
                message: format!("Request failed: {}", e),
            }
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        debug!(model = %self.model, prompt_length = prompt.len(), "Sending generate request");
        let start = Instant::now();

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::ApiError {
                message: body,
                status_code: status.as_u16(),
            });
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| BackendError::InvalidResponse {
            message: format!("JSON parse error: {}", e),
        })?;

        if !generated.done {
            warn!(model = %self.model, "Generation reported as incomplete");
        }

        info!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generation completed"
        );

        Ok(generated.response)
    }

    async fn health_check(&self) -> Result<bool, BackendError> {
        let url = format!("{}/api/tags", self.endpoint);
        debug!(url = %url, "Checking model server health");

        match self.http_client.get(&url).send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                if !healthy {
                    warn!(status = %response.status(), "Health check failed");
                }
                Ok(healthy)
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                warn!(endpoint = %self.endpoint, "Model server unreachable");
                Ok(false)
            }
            Err(e) => Err(BackendError::NetworkError {
                message: format!("Health check failed: {}", e),
            }),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    done: bool,
}
