//! Per-user conversation context
//!
//! Keeps an accumulating text buffer for every user the bot has talked to,
//! builds the combined seed for the generation endpoint, and strips the
//! echoed seed from the endpoint's output so only the new continuation is
//! sent back to the user.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Telegram user identifier
pub type UserId = i64;

/// In-memory store of per-user conversation buffers.
///
/// A user that has never been seen is equivalent to an empty buffer. Entries
/// live for the lifetime of the process; there is no persistence and no size
/// cap, so a long-running conversation grows without bound. Capping or
/// evicting old context would change what the model sees and is deliberately
/// not done here.
///
/// Two messages from the same user racing through the relay update the same
/// entry with last-write-wins semantics. Different users never contend beyond
/// the map lock itself.
#[derive(Clone, Default)]
pub struct ConversationStore {
    buffers: Arc<RwLock<HashMap<UserId, String>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            buffers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Build the combined input for the generation endpoint: the user's
    /// stored buffer followed by the new prompt. Does not mutate the store.
    pub async fn prepare(&self, user_id: UserId, prompt: &str) -> String {
        let buffers = self.buffers.read().await;
        match buffers.get(&user_id) {
            Some(buffer) => format!("{}{}", buffer, prompt),
            None => prompt.to_string(),
        }
    }

    /// Extract the newly generated suffix from `full_output` and record the
    /// exchange in the user's buffer.
    ///
    /// The endpoint echoes its seed, so `full_output` is expected to begin
    /// with `combined_input`. The reply is `full_output` with the first
    /// `combined_input`-many characters removed and surrounding whitespace
    /// trimmed. If the endpoint truncated or altered the seed and returned
    /// fewer characters than it was given, the reply clamps to empty rather
    /// than faulting.
    ///
    /// The buffer is then set to `combined_input + full_output + "\n"`. Call
    /// once per inbound message, with the exact string `prepare` returned.
    pub async fn extract_and_store(
        &self,
        user_id: UserId,
        combined_input: &str,
        full_output: &str,
    ) -> String {
        let seed_chars = combined_input.chars().count();
        let reply: String = full_output.chars().skip(seed_chars).collect();
        let reply = reply.trim().to_string();

        let mut buffers = self.buffers.write().await;
        let buffer = buffers.entry(user_id).or_default();
        buffer.clear();
        buffer.push_str(combined_input);
        buffer.push_str(full_output);
        buffer.push('\n');

        debug!(
            user_id,
            buffer_len = buffer.len(),
            reply_len = reply.len(),
            "Stored conversation exchange"
        );

        reply
    }

    /// Forget everything stored for a user. Returns true if there was any
    /// context to forget.
    pub async fn reset(&self, user_id: UserId) -> bool {
        let mut buffers = self.buffers.write().await;
        buffers.remove(&user_id).is_some()
    }

    /// Length in bytes of the stored buffer for a user (0 if unseen).
    pub async fn context_len(&self, user_id: UserId) -> usize {
        let buffers = self.buffers.read().await;
        buffers.get(&user_id).map(|b| b.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prepare_unseen_user_is_identity() {
        let store = ConversationStore::new();
        let combined = store.prepare(7, "hello world").await;
        assert_eq!(combined, "hello world");
    }

    #[tokio::test]
    async fn test_prepare_empty_prompt() {
        let store = ConversationStore::new();
        assert_eq!(store.prepare(7, "").await, "");
    }

    #[tokio::test]
    async fn test_suffix_extraction() {
        let store = ConversationStore::new();
        let reply = store.extract_and_store(1, "X", "XY").await;
        assert_eq!(reply, "Y");
    }

    #[tokio::test]
    async fn test_reply_is_whitespace_trimmed() {
        let store = ConversationStore::new();
        let reply = store.extract_and_store(1, "X", "X  Y  ").await;
        assert_eq!(reply, "Y");
    }

    #[tokio::test]
    async fn test_shortfall_clamps_to_empty_reply() {
        let store = ConversationStore::new();
        let reply = store.extract_and_store(1, "Hello", "Hi").await;
        assert_eq!(reply, "");
    }

    #[tokio::test]
    async fn test_multibyte_seed_does_not_panic() {
        let store = ConversationStore::new();
        let reply = store.extract_and_store(1, "héllo", "héllo wörld").await;
        assert_eq!(reply, "wörld");
    }

    #[tokio::test]
    async fn test_store_appends_exchange_with_newline() {
        let store = ConversationStore::new();
        store.extract_and_store(9, "c", "o").await;
        let next = store.prepare(9, "p2").await;
        assert_eq!(next, "co\np2");
    }

    #[tokio::test]
    async fn test_sequential_conversation() {
        let store = ConversationStore::new();

        // First turn: the endpoint echoes the seed and continues.
        let combined = store.prepare(42, "Hi").await;
        assert_eq!(combined, "Hi");
        let reply = store.extract_and_store(42, &combined, "Hi there!").await;
        assert_eq!(reply, "there!");

        // Second turn sees the recorded exchange as prior context.
        let combined2 = store.prepare(42, "How are you?").await;
        assert_eq!(combined2, format!("{}{}\n{}", "Hi", "Hi there!", "How are you?"));
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let store = ConversationStore::new();
        store.extract_and_store(1, "a", "ab").await;
        assert_eq!(store.prepare(2, "z").await, "z");
        assert_eq!(store.prepare(1, "z").await, "aab\nz");
    }

    #[tokio::test]
    async fn test_reset_clears_context() {
        let store = ConversationStore::new();
        store.extract_and_store(5, "a", "ab").await;
        assert!(store.context_len(5).await > 0);

        assert!(store.reset(5).await);
        assert_eq!(store.context_len(5).await, 0);
        assert_eq!(store.prepare(5, "fresh").await, "fresh");

        // Resetting an unseen user is a no-op.
        assert!(!store.reset(5).await);
    }

    #[tokio::test]
    async fn test_store_replaces_previous_buffer() {
        // The stored buffer is set to combined + output + "\n", not appended
        // to: the combined input already carries the prior buffer inside it.
        let store = ConversationStore::new();
        store.extract_and_store(3, "c", "co").await;
        store.extract_and_store(3, "c", "co").await;
        assert_eq!(store.prepare(3, "").await, "cco\n");
    }
}
