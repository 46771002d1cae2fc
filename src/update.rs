//! Transport-neutral view of one inbound Telegram update.

use teloxide::types::{CallbackQueryId, ChatId, MessageId};

use crate::session::SessionKey;

/// Kind of chat an update came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Group, supergroup and channel chats are shared with other users
    pub fn is_shared(self) -> bool {
        !matches!(self, ChatKind::Private)
    }
}

/// What the update carries besides its text
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateKind {
    /// A plain message
    Text,
    /// A message carrying a location payload
    Location { latitude: f64, longitude: f64 },
    /// An inline keyboard press on one of the bot's messages
    Callback {
        query_id: CallbackQueryId,
        message_id: MessageId,
        has_photo: bool,
    },
}

/// One inbound update
#[derive(Clone, Debug, PartialEq)]
pub struct InboundUpdate {
    pub chat_id: ChatId,
    pub user_id: i64,
    pub chat_kind: ChatKind,
    pub message_id: MessageId,
    pub text: Option<String>,
    pub kind: UpdateKind,
}

impl InboundUpdate {
    /// A plain text message
    pub fn text(chat_id: ChatId, user_id: i64, chat_kind: ChatKind, message_id: MessageId, text: &str) -> Self {
        Self {
            chat_id,
            user_id,
            chat_kind,
            message_id,
            text: Some(text.to_string()),
            kind: UpdateKind::Text,
        }
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(self.chat_id.0, self.user_id)
    }

    /// Message to edit instead of sending a new one
    pub fn reply_target(&self) -> Option<MessageId> {
        match self.kind {
            UpdateKind::Callback { message_id, .. } => Some(message_id),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<(f64, f64)> {
        match self.kind {
            UpdateKind::Location { latitude, longitude } => Some((latitude, longitude)),
            _ => None,
        }
    }

    pub fn is_callback(&self) -> bool {
        matches!(self.kind, UpdateKind::Callback { .. })
    }

    /// Whether the pressed button sits under a photo
    pub fn is_callback_on_photo(&self) -> bool {
        matches!(self.kind, UpdateKind::Callback { has_photo: true, .. })
    }

    pub fn is_in_group(&self) -> bool {
        self.chat_kind.is_shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_target_only_for_callbacks() {
        let text = InboundUpdate::text(ChatId(1), 2, ChatKind::Private, MessageId(3), "/start");
        assert_eq!(text.reply_target(), None);

        let callback = InboundUpdate {
            kind: UpdateKind::Callback {
                query_id: CallbackQueryId("q".to_string()),
                message_id: MessageId(9),
                has_photo: false,
            },
            ..text
        };
        assert_eq!(callback.reply_target(), Some(MessageId(9)));
        assert!(callback.is_callback());
        assert!(!callback.is_callback_on_photo());
    }

    #[test]
    fn test_shared_chats() {
        assert!(!ChatKind::Private.is_shared());
        assert!(ChatKind::Group.is_shared());
        assert!(ChatKind::Supergroup.is_shared());
        assert!(ChatKind::Channel.is_shared());
    }
}
