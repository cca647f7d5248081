//! Text-generation endpoint client
//!
//! Talks to a continuation-style inference endpoint (Hugging Face Inference
//! API by default). The endpoint is seeded with the combined conversation
//! input and returns the full generated text, seed included, which is what
//! lets the context layer strip the seed back off.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::RelayError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Default model endpoint; overridable via GENERATION_ENDPOINT.
pub const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/models/gpt2";

/// Decoding parameters passed through to the endpoint unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct DecodingParams {
    pub max_length: u32,
    pub no_repeat_ngram_size: u32,
    pub num_return_sequences: u32,
    /// Must stay true: suffix extraction relies on the seed being echoed.
    pub return_full_text: bool,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            max_length: 500,
            no_repeat_ngram_size: 2,
            num_return_sequences: 1,
            return_full_text: true,
        }
    }
}

/// A source of generated text, seeded with the combined conversation input.
///
/// The returned string contains the seed followed by the continuation.
#[async_trait::async_trait]
pub trait Generate: Send + Sync {
    async fn complete(&self, seed: &str) -> crate::Result<String>;
}

/// Reusable inference-endpoint client (connection-pooled)
pub struct CompletionClient {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
    params: DecodingParams,
}

impl CompletionClient {
    pub fn new(endpoint: String, api_token: Option<String>, params: DecodingParams) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_token,
            params,
        })
    }
}

#[async_trait::async_trait]
impl Generate for CompletionClient {
    async fn complete(&self, seed: &str) -> crate::Result<String> {
        let request = CompletionRequest {
            inputs: seed.to_string(),
            parameters: self.params.clone(),
            options: RequestOptions { wait_for_model: true },
        };

        info!(seed_len = seed.len(), "Calling generation endpoint");

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            error!("Generation request failed: {}", e);
            RelayError::Generation(format!("endpoint unreachable: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Generation endpoint returned {}: {}", status, error_text);
            return Err(RelayError::Generation(format!(
                "endpoint returned {}: {}",
                status, error_text
            )));
        }

        let candidates: Vec<Candidate> = response.json().await.map_err(|e| {
            error!("Failed to parse generation response: {}", e);
            RelayError::Generation(format!("response parse error: {}", e))
        })?;

        let full_output = candidates
            .into_iter()
            .next()
            .map(|c| c.generated_text)
            .ok_or_else(|| RelayError::Generation("endpoint returned no candidates".to_string()))?;

        info!(output_len = full_output.len(), "Generation endpoint responded");

        Ok(full_output)
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    inputs: String,
    parameters: DecodingParams,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    generated_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = CompletionRequest {
            inputs: "Hi there".to_string(),
            parameters: DecodingParams::default(),
            options: RequestOptions { wait_for_model: true },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["inputs"], "Hi there");
        assert_eq!(json["parameters"]["max_length"], 500);
        assert_eq!(json["parameters"]["no_repeat_ngram_size"], 2);
        assert_eq!(json["parameters"]["num_return_sequences"], 1);
        assert_eq!(json["parameters"]["return_full_text"], true);
        assert_eq!(json["options"]["wait_for_model"], true);
    }

    #[test]
    fn test_response_deserialization() {
        let body = r#"[{"generated_text": "Hi there, how are you?"}]"#;
        let candidates: Vec<Candidate> = serde_json::from_str(body).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].generated_text, "Hi there, how are you?");
    }

    #[test]
    fn test_default_params() {
        let params = DecodingParams::default();
        assert_eq!(params.max_length, 500);
        assert_eq!(params.no_repeat_ngram_size, 2);
        assert!(params.return_full_text);
    }
}
