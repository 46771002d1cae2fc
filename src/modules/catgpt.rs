//! Chat with a cat: random meows or the cat-gpt.com AI

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html;
use tracing::{debug, warn};

use super::{Module, Reply, Request};
use crate::bot::ui_builder::button_column;
use crate::db;
use crate::directive::{Directive, Media, Target};
use crate::localization::{t, t_args};
use crate::tokenizer;

const KEY: &str = "/catgpt";
const CONVERSATION_URL: &str = "https://cat-gpt.com/api/conversation";
const MAX_MEOWS: usize = 10;
const SYSTEM_PROMPT: &str = "Respond to whatever I say here as if you're a sassy cat that cares about me \
but doesn't want me to know, and you want to be helpful but you want me to want you to be helpful. \
Make sure to sprinkle in some meows every now and then, especially when replacing words like now and how.";

/// Per-user settings, stored as JSON and edited as YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatGptSettings {
    pub send_gif: bool,
    pub email: Option<String>,
    #[serde(rename = "Authorization")]
    pub authorization: Option<String>,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    #[serde(rename = "isNewThread")]
    pub is_new_thread: Option<bool>,
}

impl Default for CatGptSettings {
    fn default() -> Self {
        Self {
            send_gif: true,
            email: None,
            authorization: None,
            thread_id: None,
            is_new_thread: None,
        }
    }
}

impl CatGptSettings {
    pub async fn load(database: &db::Database, user_id: i64) -> Result<Self> {
        match db::get_catgpt_settings(database.pool(), user_id).await? {
            Some(json) => serde_json::from_str(&json).context("Stored CatGPT settings are corrupt"),
            None => Ok(Self::default()),
        }
    }

    pub async fn save(&self, database: &db::Database, user_id: i64) -> Result<()> {
        let json = serde_json::to_string(self).context("Failed to serialize CatGPT settings")?;
        db::put_catgpt_settings(database.pool(), user_id, &json).await
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to render CatGPT settings")
    }

    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.authorization.as_deref()?))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationRequest<'a> {
    user_prompt: &'a str,
    email: &'a str,
    thread_id: &'a str,
    user_requests: Vec<ChatTurn<'a>>,
    is_new_thread: bool,
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ConversationResponse {
    data: ConversationData,
}

#[derive(Deserialize)]
struct ConversationData {
    message: ConversationMessage,
}

#[derive(Deserialize)]
struct ConversationMessage {
    content: String,
}

fn gif_url() -> Result<Url> {
    let cache_buster = Utc::now().timestamp_subsec_micros();
    Ok(Url::parse(&format!("https://www.cat-gpt.com/cats/gif?{cache_buster}"))?)
}

fn meow_text() -> String {
    let count = rand::thread_rng().gen_range(1..=MAX_MEOWS);
    format!("CAT:{}", " meow".repeat(count))
}

fn new_thread_id() -> String {
    rand::thread_rng().gen_range(1..9_000_000_000_000_000u64).to_string()
}

/// Send the first word, then edit in one more word at a time
///
/// With a GIF the words are typed into its caption instead.
pub fn split_send(chat_id: ChatId, text: &str, gif: Option<Url>) -> Vec<Directive> {
    let words: Vec<&str> = text.split(' ').collect();

    match gif {
        Some(url) => {
            let mut directives = vec![Directive::SendDocument {
                chat_id,
                document: Media::Url(url),
                caption: None,
            }];
            directives.extend((1..=words.len()).map(|n| Directive::EditCaption {
                chat_id,
                target: Target::LastSent,
                caption: words[..n].join(" "),
            }));
            directives
        }
        None => {
            let mut directives = vec![Directive::text(chat_id, words[0])];
            directives.extend((2..=words.len()).map(|n| Directive::EditText {
                chat_id,
                target: Target::LastSent,
                text: words[..n].join(" "),
                markup: None,
            }));
            directives
        }
    }
}

/// Free text of an invocation
///
/// A continuation message is free text as a whole. A direct command carries
/// it after its first `words` words.
fn text_after(text: &str, words: usize) -> &str {
    let mut rest = text.trim_start();
    if !tokenizer::is_command(rest) {
        return rest;
    }
    for _ in 0..words {
        rest = match rest.find(char::is_whitespace) {
            Some(end) => rest[end..].trim_start(),
            None => "",
        };
    }
    rest
}

pub struct CatGptModule {
    http: reqwest::Client,
}

impl CatGptModule {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn chat_menu(request: &Request<'_>, with_settings: bool) -> Reply {
        let mut buttons = vec![
            (t("catgpt-menu-meow"), format!("{KEY} chat meow")),
            (t("catgpt-menu-ai"), format!("{KEY} chat ai")),
        ];
        if with_settings {
            buttons.push((t("catgpt-menu-settings"), format!("{KEY} settings")));
            buttons.push((t("catgpt-menu-help"), format!("{KEY} help")));
        }
        Reply::one(request.responder().menu(&t("ui-select-option"), button_column(buttons)))
    }

    fn reply_with(&self, request: &Request<'_>, settings: &CatGptSettings, text: &str) -> Result<Vec<Directive>> {
        let gif = if settings.send_gif { Some(gif_url()?) } else { None };
        Ok(split_send(request.chat_id(), text, gif))
    }

    async fn meow(&self, request: &Request<'_>, settings: &CatGptSettings) -> Result<Reply> {
        let session = request.head(3);

        if request.argc() <= 3 {
            return Ok(Reply::one(request.responder().text(&t("catgpt-prompt"), None)).listening(session));
        }

        let directives = self.reply_with(request, settings, &meow_text())?;
        Ok(Reply::done(directives).listening(session))
    }

    async fn ask(&self, settings: &CatGptSettings, thread_id: &str, prompt: &str) -> Result<String> {
        let (email, authorization) = settings.credentials().context("Missing credentials")?;
        let is_new_thread = settings.is_new_thread == Some(true);

        let user_requests = if is_new_thread {
            vec![
                ChatTurn {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatTurn {
                    role: "user",
                    content: format!("{thread_id} {prompt}"),
                },
            ]
        } else {
            vec![ChatTurn {
                role: "user",
                content: prompt.to_string(),
            }]
        };

        let payload = ConversationRequest {
            user_prompt: "",
            email,
            thread_id,
            user_requests,
            is_new_thread,
        };

        debug!(thread_id, is_new_thread, "Sending prompt to cat-gpt");
        let response: ConversationResponse = self
            .http
            .put(CONVERSATION_URL)
            .header(AUTHORIZATION, authorization)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(format!("CAT:{}", response.data.message.content))
    }

    async fn ai(&self, request: &Request<'_>, mut settings: CatGptSettings) -> Result<Reply> {
        let responder = request.responder();

        if settings.credentials().is_none() {
            let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                t("catgpt-update-settings"),
                format!("{KEY} settings"),
            )]]);
            return Ok(Reply::one(responder.menu(&t("catgpt-missing-credentials"), keyboard)));
        }

        match request.argc() {
            3 => {
                let keyboard = InlineKeyboardMarkup::new(vec![vec![
                    InlineKeyboardButton::callback(t("catgpt-new"), format!("{KEY} chat ai new")),
                    InlineKeyboardButton::callback(t("catgpt-resume"), format!("{KEY} chat ai resume")),
                ]]);
                Ok(Reply::one(responder.menu(&t("catgpt-new-or-resume"), keyboard)))
            }
            4 => {
                let resumed = match (request.arg(3), settings.thread_id.clone()) {
                    (Some("resume"), Some(thread_id)) => Some(thread_id),
                    _ => None,
                };
                let thread_id = match resumed {
                    Some(thread_id) => thread_id,
                    None => {
                        let thread_id = new_thread_id();
                        settings.thread_id = Some(thread_id.clone());
                        settings.is_new_thread = Some(true);
                        settings.save(request.db, request.user_id()).await?;
                        thread_id
                    }
                };

                let mut session = request.head(3).to_vec();
                session.push(thread_id);
                Ok(Reply::one(responder.text(&t("catgpt-prompt"), None)).listening(&session))
            }
            _ => {
                let session = request.head(4);
                let thread_id = &request.args[3];
                let prompt = text_after(request.update.text.as_deref().unwrap_or(""), 4);

                let answer = match self.ask(&settings, thread_id, prompt).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        warn!(user_id = request.user_id(), error = %e, "cat-gpt request failed");
                        let text = t_args("catgpt-api-error", &[("detail", &format!("{e:#}"))]);
                        let responder = responder.with_args(session);
                        return Ok(Reply::one(responder.exception(&html::escape(&text))).listening(session));
                    }
                };

                if settings.is_new_thread == Some(true) {
                    settings.is_new_thread = Some(false);
                    settings.save(request.db, request.user_id()).await?;
                }

                let directives = self.reply_with(request, &settings, &html::escape(&answer))?;
                Ok(Reply::done(directives).listening(session))
            }
        }
    }

    async fn settings(&self, request: &Request<'_>, settings: &CatGptSettings) -> Result<Reply> {
        let base = request.head(2);

        if request.update.is_in_group() {
            let responder = request.responder().with_args(base);
            return Ok(Reply::one(responder.text(&t("catgpt-settings-group"), None)));
        }

        if request.argc() == 2 {
            let yaml = html::escape(&settings.to_yaml()?);
            let text = t_args("catgpt-settings-prompt", &[("yaml", yaml.trim_end())]);
            return Ok(Reply::one(request.responder().text(&text, None)).listening(request.args));
        }

        let source = text_after(request.update.text.as_deref().unwrap_or(""), 2);
        match CatGptSettings::from_yaml(source) {
            Ok(updated) => {
                updated.save(request.db, request.user_id()).await?;
                debug!(user_id = request.user_id(), "CatGPT settings updated");
                let responder = request.responder().with_args(base);
                Ok(Reply::one(responder.text(&t("catgpt-settings-saved"), None)))
            }
            Err(e) => {
                let text = t_args("catgpt-invalid-yaml", &[("detail", &e.to_string())]);
                let responder = request.responder().with_args(base);
                Ok(Reply::one(responder.exception(&html::escape(&text))).listening(base))
            }
        }
    }
}

#[async_trait]
impl Module for CatGptModule {
    fn key(&self) -> &str {
        KEY
    }

    fn description(&self) -> &str {
        "Talk to a Cat!"
    }

    /// Chat prompts and settings YAML are free text
    fn takes_plain_words(&self, words: &[&str]) -> bool {
        matches!(words.get(1).copied(), Some("chat" | "settings"))
    }

    async fn handle(&self, request: &Request<'_>) -> Result<Reply> {
        let Some(action) = request.arg(1) else {
            return Ok(Self::chat_menu(request, true));
        };

        match action {
            "help" => {
                let text = t_args("catgpt-help", &[("key", KEY)]);
                Ok(Reply::one(request.responder().text(&text, None)))
            }
            "settings" => {
                let settings = CatGptSettings::load(request.db, request.user_id()).await?;
                self.settings(request, &settings).await
            }
            "chat" => match request.arg(2) {
                None => Ok(Self::chat_menu(request, false)),
                Some("meow") => {
                    let settings = CatGptSettings::load(request.db, request.user_id()).await?;
                    self.meow(request, &settings).await
                }
                Some("ai") => {
                    let settings = CatGptSettings::load(request.db, request.user_id()).await?;
                    self.ai(request, settings).await
                }
                Some(other) => {
                    let text = t_args("catgpt-invalid-argument", &[("argument", other)]);
                    Ok(Reply::one(request.responder().exception(&html::escape(&text))))
                }
            },
            other => {
                let text = t_args("catgpt-invalid-argument", &[("argument", other)]);
                Ok(Reply::one(request.responder().exception(&html::escape(&text))))
            }
        }
    }
}
