//! Outbound directives produced by modules and delivered by the response funnel.

use reqwest::Url;
use teloxide::types::{CallbackQueryId, ChatId, InlineKeyboardMarkup, InputFile, MessageId, ReplyMarkup};

/// Message an edit applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Message(MessageId),
    /// The message most recently sent earlier in the same directive sequence
    LastSent,
}

/// Photo or document payload
#[derive(Clone, Debug, PartialEq)]
pub enum Media {
    Bytes { data: Vec<u8>, file_name: String },
    Url(Url),
}

impl Media {
    pub fn into_input_file(self) -> InputFile {
        match self {
            Media::Bytes { data, file_name } => InputFile::memory(data).file_name(file_name),
            Media::Url(url) => InputFile::url(url),
        }
    }
}

/// One outbound instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    SendText {
        chat_id: ChatId,
        text: String,
        markup: Option<ReplyMarkup>,
        reply_to: Option<MessageId>,
    },
    EditText {
        chat_id: ChatId,
        target: Target,
        text: String,
        markup: Option<InlineKeyboardMarkup>,
    },
    SendPhoto {
        chat_id: ChatId,
        photo: Media,
        caption: Option<String>,
        markup: Option<InlineKeyboardMarkup>,
    },
    EditMedia {
        chat_id: ChatId,
        target: Target,
        photo: Media,
        caption: Option<String>,
        markup: Option<InlineKeyboardMarkup>,
    },
    SendDocument {
        chat_id: ChatId,
        document: Media,
        caption: Option<String>,
    },
    EditCaption {
        chat_id: ChatId,
        target: Target,
        caption: String,
    },
    AnswerCallback {
        query_id: CallbackQueryId,
    },
}

impl Directive {
    /// Plain text message without markup
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Directive::SendText {
            chat_id,
            text: text.into(),
            markup: None,
            reply_to: None,
        }
    }

    /// Edit target of the directive, if it edits a message
    pub fn target(&self) -> Option<Target> {
        match self {
            Directive::EditText { target, .. }
            | Directive::EditMedia { target, .. }
            | Directive::EditCaption { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// The same directive pointed at a concrete message
    pub fn with_target(mut self, message_id: MessageId) -> Self {
        match &mut self {
            Directive::EditText { target, .. }
            | Directive::EditMedia { target, .. }
            | Directive::EditCaption { target, .. } => *target = Target::Message(message_id),
            _ => {}
        }
        self
    }

    /// Visible text or caption, for logging and tests
    pub fn body(&self) -> Option<&str> {
        match self {
            Directive::SendText { text, .. } | Directive::EditText { text, .. } => Some(text),
            Directive::SendPhoto { caption, .. }
            | Directive::EditMedia { caption, .. }
            | Directive::SendDocument { caption, .. } => caption.as_deref(),
            Directive::EditCaption { caption, .. } => Some(caption),
            Directive::AnswerCallback { .. } => None,
        }
    }
}
