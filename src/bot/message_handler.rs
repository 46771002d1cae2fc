//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::Chat;
use tracing::debug;

use crate::update::{ChatKind, InboundUpdate, UpdateKind};

use super::outbound::TelegramOutbound;
use super::pipeline::{process_update, App};

pub fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_channel() {
        ChatKind::Channel
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_group() {
        ChatKind::Group
    } else {
        ChatKind::Private
    }
}

/// Convert a Telegram message; a message without sender belongs to user 0
pub fn inbound_from_message(msg: &Message) -> InboundUpdate {
    let user_id = msg.from.as_ref().map(|user| user.id.0 as i64).unwrap_or(0);

    let kind = match msg.location() {
        Some(location) => UpdateKind::Location {
            latitude: location.latitude,
            longitude: location.longitude,
        },
        None => UpdateKind::Text,
    };

    InboundUpdate {
        chat_id: msg.chat.id,
        user_id,
        chat_kind: chat_kind(&msg.chat),
        message_id: msg.id,
        text: msg.text().map(str::to_string),
        kind,
    }
}

/// Handle incoming messages
pub async fn message_handler(bot: Bot, msg: Message, app: Arc<App>) -> Result<()> {
    let update = inbound_from_message(&msg);
    debug!(user_id = update.user_id, chat_id = %update.chat_id, "Received message");

    let outbound = TelegramOutbound::new(bot);
    process_update(&app, &outbound, &update).await?;
    Ok(())
}
