//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, warn};

use crate::directive::Directive;
use crate::update::{InboundUpdate, UpdateKind};

use super::message_handler::chat_kind;
use super::outbound::{Outbound, TelegramOutbound};
use super::pipeline::{process_update, App};

/// Convert a callback query on one of the bot's messages
///
/// Queries from inline-mode messages carry no chat and yield `None`.
pub fn inbound_from_callback(q: &CallbackQuery) -> Option<InboundUpdate> {
    let message = q.message.as_ref()?;
    let message_id = message.id();
    let has_photo = message
        .regular_message()
        .and_then(|m| m.photo())
        .is_some();

    Some(InboundUpdate {
        chat_id: message.chat().id,
        user_id: q.from.id.0 as i64,
        chat_kind: chat_kind(message.chat()),
        message_id,
        text: q.data.clone(),
        kind: UpdateKind::Callback {
            query_id: q.id.clone(),
            message_id,
            has_photo,
        },
    })
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler(bot: Bot, q: CallbackQuery, app: Arc<App>) -> Result<()> {
    debug!(user_id = %q.from.id, "Received callback query from user");

    let outbound = TelegramOutbound::new(bot);
    let Some(update) = inbound_from_callback(&q) else {
        warn!(user_id = %q.from.id, "Callback query without a message, ignoring");
        let directive = Directive::AnswerCallback {
            query_id: q.id.clone(),
        };
        outbound.send(directive).await?;
        return Ok(());
    };

    process_update(&app, &outbound, &update).await?;
    Ok(())
}
