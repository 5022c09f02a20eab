//! Query operations against inference backends
//!
//! The engine only ever sees a resolved backend handle through
//! [`QueryOperation`]. Prompt construction, retrieval and backend lifecycle
//! live with the caller.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// An opaque question -> answer call against one backend
pub trait QueryOperation: Send + Sync {
    fn query(&self, question: &str) -> impl Future<Output = Result<String>> + Send;
}

impl<F, Fut> QueryOperation for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    fn query(&self, question: &str) -> impl Future<Output = Result<String>> + Send {
        (self)(question.to_string())
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
}

/// Ollama model served over HTTP (`POST /api/generate`, non-streaming)
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Same endpoint and client, different model identifier
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            model: model.into(),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }
}

impl QueryOperation for OllamaBackend {
    fn query(&self, question: &str) -> impl Future<Output = Result<String>> + Send {
        let request = self
            .client
            .post(self.generate_url())
            .json(&GenerateRequest {
                model: &self.model,
                prompt: question,
                stream: false,
            });

        async move {
            let response = request
                .send()
                .await
                .context("Backend request failed")?
                .error_for_status()
                .context("Backend returned an error status")?;

            let body: GenerateResponse = response
                .json()
                .await
                .context("Backend response was not valid JSON")?;

            Ok(body.response)
        }
    }
}
