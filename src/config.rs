//! Environment-driven configuration
//!
//! All settings come from the process environment, with a .env file loaded
//! at startup by the binary.

use crate::error::RelayError;
use crate::generation::{DecodingParams, DEFAULT_ENDPOINT};
use std::env;

/// Runtime configuration for the relay bot.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Telegram bot API token (required).
    pub telegram_token: String,
    /// URL of the text-generation endpoint.
    pub generation_endpoint: String,
    /// Optional bearer token for the generation endpoint.
    pub api_token: Option<String>,
    /// Decoding parameters forwarded to the endpoint.
    pub decoding: DecodingParams,
}

impl RelayConfig {
    /// Read configuration from the environment.
    pub fn from_env() -> crate::Result<Self> {
        let telegram_token = env::var("TELEGRAM_BOT_TOKEN").map_err(|_| {
            RelayError::Config("TELEGRAM_BOT_TOKEN is not set".to_string())
        })?;

        let generation_endpoint =
            env::var("GENERATION_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let api_token = env::var("HF_API_TOKEN").ok().filter(|t| !t.is_empty());

        let mut decoding = DecodingParams::default();
        if let Some(max_length) = read_optional_u32("GENERATION_MAX_LENGTH")? {
            decoding.max_length = max_length;
        }
        if let Some(ngram) = read_optional_u32("GENERATION_NO_REPEAT_NGRAM")? {
            decoding.no_repeat_ngram_size = ngram;
        }

        Ok(Self {
            telegram_token,
            generation_endpoint,
            api_token,
            decoding,
        })
    }
}

fn read_optional_u32(key: &str) -> crate::Result<Option<u32>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| RelayError::Config(format!("{} is not a valid integer: {}", key, raw))),
        Err(_) => Ok(None),
    }
}
