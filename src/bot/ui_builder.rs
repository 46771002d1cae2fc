//! UI Builder module for creating keyboards and formatting replies

use chrono::Local;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ReplyMarkup};
use teloxide::utils::html;

use crate::directive::{Directive, Media, Target};
use crate::localization::{t, t_args};
use crate::tokenizer;

/// Current local time as shown on refreshed and failed replies
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One inline button per row
pub fn button_column<I, L, D>(buttons: I) -> InlineKeyboardMarkup
where
    I: IntoIterator<Item = (L, D)>,
    L: Into<String>,
    D: Into<String>,
{
    InlineKeyboardMarkup::new(
        buttons
            .into_iter()
            .map(|(label, data)| vec![InlineKeyboardButton::callback(label, data)]),
    )
}

/// Inline keyboard with a single refresh button re-issuing `args`
pub fn refresh_keyboard<S: AsRef<str>>(args: &[S]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        t("ui-refresh"),
        tokenizer::join(args),
    )]])
}

/// Builds reply directives for one command invocation
///
/// Text replies are prefixed with the invoked command and get a back button
/// that re-issues the command without its last argument. Replies edit the
/// message the user pressed a button on and are sent fresh otherwise.
#[derive(Clone, Debug)]
pub struct Responder {
    chat_id: ChatId,
    message_id: Option<MessageId>,
    args: Vec<String>,
}

impl Responder {
    pub fn new<S: AsRef<str>>(chat_id: ChatId, message_id: Option<MessageId>, args: &[S]) -> Self {
        Self {
            chat_id,
            message_id,
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        }
    }

    /// Use `args` for the label and back button instead of the invocation
    pub fn with_args<S: AsRef<str>>(mut self, args: &[S]) -> Self {
        self.args = args.iter().map(|a| a.as_ref().to_string()).collect();
        self
    }

    /// Always send a new message
    pub fn sending(mut self) -> Self {
        self.message_id = None;
        self
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn is_editing(&self) -> bool {
        self.message_id.is_some()
    }

    fn label(&self) -> String {
        let quoted: Vec<String> = self
            .args
            .iter()
            .map(|a| if a.contains(' ') { format!("'{a}'") } else { a.clone() })
            .collect();
        format!("[<pre>{}</pre>]\n", html::escape(&quoted.join(" ")))
    }

    /// A text reply, edited in place when possible
    pub fn text(&self, text: &str, markup: Option<ReplyMarkup>) -> Directive {
        let text = format!("{}{text}", self.label());

        let markup = if self.args.len() > 1 {
            let back = InlineKeyboardButton::callback(
                t("ui-back"),
                tokenizer::join(&self.args[..self.args.len() - 1]),
            );
            match markup {
                None => Some(ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(vec![vec![back]]))),
                Some(ReplyMarkup::InlineKeyboard(mut keyboard)) => {
                    keyboard.inline_keyboard.push(vec![back]);
                    Some(ReplyMarkup::InlineKeyboard(keyboard))
                }
                other => other,
            }
        } else {
            markup
        };

        match (self.message_id, markup) {
            (Some(message_id), None) => Directive::EditText {
                chat_id: self.chat_id,
                target: Target::Message(message_id),
                text,
                markup: None,
            },
            (Some(message_id), Some(ReplyMarkup::InlineKeyboard(keyboard))) => Directive::EditText {
                chat_id: self.chat_id,
                target: Target::Message(message_id),
                text,
                markup: Some(keyboard),
            },
            // Reply keyboards can only be attached to new messages
            (_, markup) => Directive::SendText {
                chat_id: self.chat_id,
                text,
                markup,
                reply_to: None,
            },
        }
    }

    /// Text reply with an inline keyboard
    pub fn menu(&self, text: &str, keyboard: InlineKeyboardMarkup) -> Directive {
        self.text(text, Some(ReplyMarkup::InlineKeyboard(keyboard)))
    }

    /// A failure reply stamped with the current time and a retry button
    pub fn exception(&self, text: &str) -> Directive {
        let text = format!("{text}\n\n{}", t_args("ui-timestamp", &[("timestamp", &timestamp())]));

        let markup = (self.args.len() > 1).then(|| {
            ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(vec![vec![
                InlineKeyboardButton::callback(t("ui-retry"), tokenizer::join(&self.args)),
            ]]))
        });

        self.text(&text, markup)
    }

    /// A photo reply, replacing the media of the pressed message when editing
    pub fn photo(&self, photo: Media, caption: Option<String>, markup: Option<InlineKeyboardMarkup>) -> Directive {
        match self.message_id {
            Some(message_id) => Directive::EditMedia {
                chat_id: self.chat_id,
                target: Target::Message(message_id),
                photo,
                caption,
                markup,
            },
            None => Directive::SendPhoto {
                chat_id: self.chat_id,
                photo,
                caption,
                markup,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::{KeyboardButton, KeyboardMarkup};

    fn inline_rows(directive: &Directive) -> Vec<Vec<String>> {
        let keyboard = match directive {
            Directive::EditText { markup: Some(k), .. } => k.clone(),
            Directive::SendText {
                markup: Some(ReplyMarkup::InlineKeyboard(k)),
                ..
            } => k.clone(),
            _ => return Vec::new(),
        };
        keyboard
            .inline_keyboard
            .iter()
            .map(|row| row.iter().map(|b| b.text.clone()).collect())
            .collect()
    }

    #[test]
    fn test_label_and_send_without_message() {
        let responder = Responder::new(ChatId(5), None, &["/start"]);
        match responder.text("hello", None) {
            Directive::SendText { text, markup, .. } => {
                assert_eq!(text, "[<pre>/start</pre>]\nhello");
                assert!(markup.is_none());
            }
            other => panic!("expected a send, got {other:?}"),
        }
    }

    #[test]
    fn test_back_button_and_edit_with_message() {
        let responder = Responder::new(ChatId(5), Some(MessageId(8)), &["/weathersg", "forecast24h"]);
        let directive = responder.text("pick", None);

        match &directive {
            Directive::EditText { target, markup: Some(keyboard), .. } => {
                assert_eq!(*target, Target::Message(MessageId(8)));
                let back = &keyboard.inline_keyboard[0][0];
                assert_eq!(back.text, t("ui-back"));
            }
            other => panic!("expected an edit, got {other:?}"),
        }
    }

    #[test]
    fn test_reply_keyboard_forces_send_without_back_button() {
        let responder = Responder::new(ChatId(5), Some(MessageId(8)), &["/weathersg", "forecast2h"]);
        let keyboard = KeyboardMarkup::new(vec![vec![KeyboardButton::new("loc")]]);
        let directive = responder.text("where?", Some(ReplyMarkup::Keyboard(keyboard)));

        match directive {
            Directive::SendText { markup: Some(ReplyMarkup::Keyboard(_)), .. } => {}
            other => panic!("expected a send with a reply keyboard, got {other:?}"),
        }
    }

    #[test]
    fn test_exception_adds_retry_and_back() {
        let responder = Responder::new(ChatId(5), None, &["/catgpt", "chat", "ai"]);
        let directive = responder.exception("API Error");

        let body = directive.body().unwrap_or_default().to_string();
        assert!(body.contains("API Error\n\nts: "));
        assert_eq!(inline_rows(&directive), vec![vec![t("ui-retry")], vec![t("ui-back")]]);
    }

    #[test]
    fn test_label_escapes_html_and_quotes_spaces() {
        let responder = Responder::new(ChatId(5), None, &["/shortcuts", "a <b>", "c"]);
        let body = responder.text("x", None).body().unwrap_or_default().to_string();
        assert!(body.starts_with("[<pre>/shortcuts 'a &lt;b&gt;' c</pre>]\n"));
    }

    #[test]
    fn test_photo_send_or_edit() {
        let media = Media::Bytes {
            data: vec![1, 2, 3],
            file_name: "map.png".to_string(),
        };
        let editing = Responder::new(ChatId(1), Some(MessageId(2)), &["/weathersg", "rainmap"]);
        assert!(matches!(
            editing.photo(media.clone(), None, None),
            Directive::EditMedia { .. }
        ));
        assert!(matches!(
            editing.sending().photo(media, None, None),
            Directive::SendPhoto { .. }
        ));
    }
}
