//! Delivery of directives through the Telegram Bot API

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputMedia, InputMediaPhoto, MessageId, ParseMode, ReplyParameters};
use teloxide::RequestError;

use crate::directive::{Directive, Target};

/// Sink for outbound directives
///
/// Returns the id of the message a directive created or edited, if any.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send(&self, directive: Directive) -> Result<Option<MessageId>, RequestError>;
}

/// Edit targets must be resolved before delivery
fn message_id(target: Target) -> Result<MessageId, RequestError> {
    match target {
        Target::Message(id) => Ok(id),
        Target::LastSent => Err(RequestError::Api(teloxide::ApiError::Unknown(
            "edit target was not resolved".to_string(),
        ))),
    }
}

/// Production outbound backed by a teloxide `Bot`
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn send(&self, directive: Directive) -> Result<Option<MessageId>, RequestError> {
        let sent = match directive {
            Directive::SendText {
                chat_id,
                text,
                markup,
                reply_to,
            } => {
                let mut request = self
                    .bot
                    .send_message(chat_id, text)
                    .parse_mode(ParseMode::Html)
                    .disable_notification(true);
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                if let Some(reply_to) = reply_to {
                    request = request.reply_parameters(ReplyParameters::new(reply_to));
                }
                request.await?
            }
            Directive::EditText {
                chat_id,
                target,
                text,
                markup,
            } => {
                let mut request = self
                    .bot
                    .edit_message_text(chat_id, message_id(target)?, text)
                    .parse_mode(ParseMode::Html);
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await?
            }
            Directive::SendPhoto {
                chat_id,
                photo,
                caption,
                markup,
            } => {
                let mut request = self
                    .bot
                    .send_photo(chat_id, photo.into_input_file())
                    .disable_notification(true);
                if let Some(caption) = caption {
                    request = request.caption(caption).parse_mode(ParseMode::Html);
                }
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await?
            }
            Directive::EditMedia {
                chat_id,
                target,
                photo,
                caption,
                markup,
            } => {
                let mut media = InputMediaPhoto::new(photo.into_input_file());
                if let Some(caption) = caption {
                    media = media.caption(caption).parse_mode(ParseMode::Html);
                }
                let mut request = self
                    .bot
                    .edit_message_media(chat_id, message_id(target)?, InputMedia::Photo(media));
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await?
            }
            Directive::SendDocument {
                chat_id,
                document,
                caption,
            } => {
                let mut request = self
                    .bot
                    .send_document(chat_id, document.into_input_file())
                    .disable_notification(true);
                if let Some(caption) = caption {
                    request = request.caption(caption).parse_mode(ParseMode::Html);
                }
                request.await?
            }
            Directive::EditCaption {
                chat_id,
                target,
                caption,
            } => {
                self.bot
                    .edit_message_caption(chat_id, message_id(target)?)
                    .caption(caption)
                    .parse_mode(ParseMode::Html)
                    .await?
            }
            Directive::AnswerCallback { query_id } => {
                self.bot.answer_callback_query(query_id).await?;
                return Ok(None);
            }
        };

        Ok(Some(sent.id))
    }
}
