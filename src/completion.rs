// src/completion.rs

//! Client for the text-generation backend.
//!
//! The backend is treated as an opaque HTTP completion service:
//! one JSON request in, one JSON document out. Streaming is disabled,
//! the full completion is awaited as a single unit.

use crate::config::CompletionConfig;

use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("network error while calling the completion backend: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("completion backend returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("completion backend returned a non-JSON body")]
    Decode(#[source] serde_json::Error),

    #[error("completion backend response has no text field")]
    MissingField,

    #[error("invalid completion endpoint {0:?}")]
    Endpoint(String),
}

/// Per-call generation parameters.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl From<&CompletionConfig> for GenerateOptions {
    fn from(cfg: &CompletionConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

/// HTTP client for the completion backend.
///
/// Built once at start-up and shared by every request handler.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: Client,
    endpoint: Url,
    defaults: GenerateOptions,
}

impl CompletionClient {
    pub fn new(cfg: &CompletionConfig) -> Result<Self, CompletionError> {
        let endpoint =
            Url::parse(&cfg.endpoint).map_err(|_| CompletionError::Endpoint(cfg.endpoint.clone()))?;

        Ok(Self {
            http: Client::new(),
            endpoint,
            defaults: GenerateOptions::from(cfg),
        })
    }

    pub fn defaults(&self) -> &GenerateOptions {
        &self.defaults
    }

    /// Generate with the configured model and parameters.
    pub async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        self.generate_code(prompt, &self.defaults).await
    }

    /// Send `prompt` to the backend and return the generated text.
    ///
    /// Fails when:
    /// - the request cannot be completed
    /// - the backend answers with a non-success status
    /// - the body is not JSON
    /// - neither `response` nor `output` is present
    pub async fn generate_code(
        &self,
        prompt: &str,
        opts: &GenerateOptions,
    ) -> Result<String, CompletionError> {
        let payload = GenerateRequest {
            model: &opts.model,
            prompt,
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
            stream: false,
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .timeout(opts.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(CompletionError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(CompletionError::Transport)?;

        if status != StatusCode::OK {
            return Err(CompletionError::Status { status, body });
        }

        let data: Value = serde_json::from_str(&body).map_err(CompletionError::Decode)?;
        extract_text(&data)
    }

    /// Ask the backend to pull `model`.
    ///
    /// Uses the backend's `/api/pull` route on the same host as the
    /// generate endpoint.
    pub async fn pull_model(&self, model: &str, timeout: Duration) -> Result<(), CompletionError> {
        let mut url = self.endpoint.clone();
        url.set_path("/api/pull");
        url.set_query(None);

        let response = self
            .http
            .post(url)
            .timeout(timeout)
            .json(&PullRequest {
                name: model,
                stream: false,
            })
            .send()
            .await
            .map_err(CompletionError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        Ok(())
    }
}

/// Pull the generated text out of a backend response.
///
/// Some backend versions use `output` instead of `response`.
fn extract_text(data: &Value) -> Result<String, CompletionError> {
    ["response", "output"]
        .iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or(CompletionError::MissingField)
}
