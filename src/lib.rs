//! Context Relay Bot
//!
//! A Telegram bot that relays each text message, together with the sender's
//! accumulated conversation context, to a continuation-style text-generation
//! endpoint and sends back only the newly generated text.
//!
//! RELAY ROUND:
//! MESSAGE → PREPARE (buffer + prompt) → GENERATE → EXTRACT SUFFIX → REPLY

pub mod bot;
pub mod config;
pub mod context;
pub mod error;
pub mod generation;

pub use error::Result;

// Re-export common types
pub use config::RelayConfig;
pub use context::ConversationStore;
pub use generation::{CompletionClient, DecodingParams, Generate};
