//! Telegram transport
//!
//! Long-polling dispatcher that routes commands and plain text messages.
//! Each text message runs one relay round: prepare the combined input,
//! call the generation endpoint, extract the new suffix, reply.
//!
//! teloxide spawns a task per update, so one user's slow generation call
//! never blocks replies to other users.

use crate::config::RelayConfig;
use crate::context::ConversationStore;
use crate::generation::{CompletionClient, Generate};
use std::sync::Arc;
use teloxide::{
    dispatching::UpdateFilterExt,
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::{ChatAction, Update},
    utils::command::BotCommands,
};
use tracing::{error, info, warn};

const GREETING: &str =
    "Hello! I am your AI-powered Telegram bot. Type anything, and I will reply.";

const HELP_TEXT: &str = "Send me a message, and I will reply with a generated response. \
I remember our conversation, so replies build on what was said before.\n\n\
Use /reset to make me forget the conversation so far.";

/// Sent while the generation call is in flight.
const THINKING: &str = "Thinking...";

/// Shown when the model echoed the seed but produced no new text.
const EMPTY_REPLY_NOTICE: &str = "(I have nothing to add to that.)";

/// Shown when the generation endpoint fails; the stored context is left
/// untouched so the user can simply try again.
const GENERATION_FAILED: &str =
    "Sorry, I could not come up with a reply just now. Please try again.";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "greet and explain what the bot does.")]
    Start,
    #[command(description = "show usage help.")]
    Help,
    #[command(description = "forget the stored conversation context.")]
    Reset,
}

/// Shared state handed to every handler invocation.
pub struct RelayState {
    pub store: ConversationStore,
    pub generator: Arc<dyn Generate>,
}

/// Run the bot until the dispatcher stops (ctrl-c or fatal polling error).
pub async fn run_relay_bot(config: RelayConfig) -> crate::Result<()> {
    let generator = CompletionClient::new(
        config.generation_endpoint.clone(),
        config.api_token.clone(),
        config.decoding.clone(),
    )?;

    let state = Arc::new(RelayState {
        store: ConversationStore::new(),
        generator: Arc::new(generator),
    });

    let bot = Bot::new(config.telegram_token.clone());

    let me = bot.get_me().await?;
    info!(
        "Bot authenticated: @{} (ID: {})",
        me.username.as_deref().unwrap_or("unknown"),
        me.id
    );

    // A leftover webhook silently breaks long polling.
    if let Err(e) = bot.delete_webhook().await {
        warn!("Failed to delete webhook: {} (continuing anyway)", e);
    }

    info!(endpoint = %config.generation_endpoint, "Starting dispatcher with long polling");

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_message().endpoint(message_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::clone(&state)])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in message handler",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    warn!("Dispatcher stopped");
    Ok(())
}

async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<RelayState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, GREETING).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, HELP_TEXT).await?;
        }
        Command::Reset => {
            let user_id = sender_id(&msg);
            let had_context = state.store.reset(user_id).await;
            let text = if had_context {
                "Done, I have forgotten our conversation."
            } else {
                "There was nothing to forget."
            };
            bot.send_message(msg.chat.id, text).await?;
        }
    }
    Ok(())
}

async fn message_handler(bot: Bot, msg: Message, state: Arc<RelayState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        // Stickers, photos, etc. are not relayed.
        return Ok(());
    };

    let user_id = sender_id(&msg);
    info!(
        user_id,
        chat_id = msg.chat.id.0,
        text_len = text.len(),
        "Message received"
    );

    if let Err(e) = relay_round(&bot, &msg, &state, user_id, text).await {
        error!(user_id, "Relay round failed: {}", e);
        bot.send_message(msg.chat.id, GENERATION_FAILED).await?;
    }

    Ok(())
}

/// One full relay round: prepare, generate, extract, reply.
///
/// The store is only updated after a successful generation call, so a failed
/// round leaves the conversation exactly where it was.
async fn relay_round(
    bot: &Bot,
    msg: &Message,
    state: &RelayState,
    user_id: i64,
    text: &str,
) -> crate::Result<()> {
    let combined = state.store.prepare(user_id, text).await;

    bot.send_message(msg.chat.id, THINKING).await?;
    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;

    let full_output = state.generator.complete(&combined).await?;
    let reply = state
        .store
        .extract_and_store(user_id, &combined, &full_output)
        .await;

    // Telegram rejects empty message text.
    let reply = if reply.is_empty() {
        EMPTY_REPLY_NOTICE.to_string()
    } else {
        reply
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

fn sender_id(msg: &Message) -> i64 {
    msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0)
}
