//! Response funnel: ordered delivery and user-facing error replies

use teloxide::types::{CallbackQueryId, ChatId, MessageId};
use teloxide::utils::html;
use tracing::{debug, error, warn};

use crate::directive::{Directive, Target};
use crate::errors::BotError;
use crate::localization::{t, t_args};
use crate::update::{ChatKind, InboundUpdate, UpdateKind};

use super::outbound::Outbound;

/// Delivers the directives produced for one update
pub struct Funnel<'a> {
    outbound: &'a dyn Outbound,
    chat_id: ChatId,
    chat_kind: ChatKind,
    /// Error replies quote the triggering message, if there is one
    reply_to: Option<MessageId>,
}

impl<'a> Funnel<'a> {
    pub fn new(outbound: &'a dyn Outbound, update: &InboundUpdate) -> Self {
        let reply_to = match update.kind {
            UpdateKind::Callback { .. } => None,
            _ => Some(update.message_id),
        };
        Self {
            outbound,
            chat_id: update.chat_id,
            chat_kind: update.chat_kind,
            reply_to,
        }
    }

    /// Stop the client's loading indicator; failures are only logged
    pub async fn acknowledge(&self, query_id: &CallbackQueryId) {
        let directive = Directive::AnswerCallback {
            query_id: query_id.clone(),
        };
        if let Err(e) = self.outbound.send(directive).await {
            warn!(chat_id = %self.chat_id, error = %e, "Failed to answer callback query");
        }
    }

    /// Send directives in order and return how many were delivered
    ///
    /// A "message is not modified" rejection counts as delivered. Any other
    /// failure stops delivery.
    pub async fn emit(&self, directives: Vec<Directive>) -> Result<usize, BotError> {
        let mut last_sent: Option<MessageId> = None;
        let mut delivered = 0;

        for directive in directives {
            let directive = match directive.target() {
                Some(Target::LastSent) => match last_sent {
                    Some(id) => directive.with_target(id),
                    None => return Err(BotError::MissingEditTarget),
                },
                _ => directive,
            };

            match self.outbound.send(directive).await {
                Ok(id) => {
                    if id.is_some() {
                        last_sent = id;
                    }
                }
                Err(e) => {
                    let e = BotError::from(e);
                    if !e.is_message_not_modified() {
                        return Err(e);
                    }
                    debug!(chat_id = %self.chat_id, "Message not modified, continuing");
                }
            }
            delivered += 1;
        }

        Ok(delivered)
    }

    /// Deliver directives, reporting a failure to the user
    pub async fn deliver(&self, directives: Vec<Directive>) {
        if let Err(e) = self.emit(directives).await {
            self.report(&e).await;
        }
    }

    /// The reply shown for an error, if the user should see one
    pub fn error_reply(&self, err: &BotError) -> Option<Directive> {
        let text = match err {
            _ if err.is_message_not_modified() => return None,
            BotError::EmptyInput if self.chat_kind.is_shared() => return None,
            BotError::EmptyInput => t("error-not-a-command"),
            BotError::Parse(e) => t_args("error-parsing", &[("detail", &html::escape(&e.to_string()))]),
            BotError::UnknownCommand(command) => {
                t_args("error-unknown-command", &[("command", &html::escape(command))])
            }
            other => t_args("error-unexpected", &[("detail", &html::escape(&other.to_string()))]),
        };

        Some(Directive::SendText {
            chat_id: self.chat_id,
            text,
            markup: None,
            reply_to: self.reply_to,
        })
    }

    /// Best-effort error reply; failures to send it are only logged
    pub async fn report(&self, err: &BotError) {
        match err {
            BotError::EmptyInput | BotError::Parse(_) | BotError::UnknownCommand(_) => {
                debug!(chat_id = %self.chat_id, error = %err, "Rejected input");
            }
            _ if err.is_message_not_modified() => {}
            _ => error!(chat_id = %self.chat_id, error = %err, "Failed to handle update"),
        }

        let Some(reply) = self.error_reply(err) else {
            return;
        };
        if let Err(e) = self.outbound.send(reply).await {
            error!(chat_id = %self.chat_id, error = %e, "Failed to send error reply");
        }
    }
}
