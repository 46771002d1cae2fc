#![allow(dead_code)]

use async_trait::async_trait;
use hookbot::bot::{App, Outbound, Registry};
use hookbot::db::Database;
use hookbot::directive::{Directive, Target};
use hookbot::modules::{Module, Reply, Request};
use hookbot::update::{ChatKind, InboundUpdate, UpdateKind};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use teloxide::types::{CallbackQueryId, ChatId, MessageId};
use teloxide::RequestError;

pub const CHAT: i64 = 100;
pub const USER: i64 = 7;

type FailWhen = dyn Fn(&Directive) -> Option<RequestError> + Send + Sync;

/// Outbound double that records every directive it is given
pub struct RecordingOutbound {
    sent: Mutex<Vec<Directive>>,
    next_id: AtomicI32,
    fail_when: Box<FailWhen>,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self::failing(|_| None)
    }

    /// Reject directives for which `fail_when` returns an error
    pub fn failing<F>(fail_when: F) -> Self
    where
        F: Fn(&Directive) -> Option<RequestError> + Send + Sync + 'static,
    {
        Self {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(1000),
            fail_when: Box::new(fail_when),
        }
    }

    /// Every directive, including callback answers and rejected ones
    pub fn sent(&self) -> Vec<Directive> {
        self.sent.lock().unwrap().clone()
    }

    /// Directives that show something in the chat
    pub fn messages(&self) -> Vec<Directive> {
        self.sent()
            .into_iter()
            .filter(|d| !matches!(d, Directive::AnswerCallback { .. }))
            .collect()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.messages()
            .iter()
            .filter_map(|d| d.body().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    async fn send(&self, directive: Directive) -> Result<Option<MessageId>, RequestError> {
        self.sent.lock().unwrap().push(directive.clone());

        if let Some(err) = (self.fail_when)(&directive) {
            return Err(err);
        }

        Ok(match directive {
            Directive::AnswerCallback { .. } => None,
            other => match other.target() {
                Some(Target::Message(id)) => Some(id),
                _ => Some(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst))),
            },
        })
    }
}

/// What the recorder module saw when it was invoked
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub listening: bool,
}

/// Test module that records its invocations
///
/// `args[1]` selects the behaviour: `listen`, `fail`, `noop`, `typed` or plain echo.
pub struct RecorderModule {
    key: &'static str,
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl RecorderModule {
    pub fn new(key: &'static str) -> (Self, Arc<Mutex<Vec<Invocation>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                key,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl Module for RecorderModule {
    fn key(&self) -> &str {
        self.key
    }

    fn description(&self) -> &str {
        "Records invocations"
    }

    async fn handle(&self, request: &Request<'_>) -> anyhow::Result<Reply> {
        let state = request.db.sessions().get(request.update.session_key()).await?;
        self.calls.lock().unwrap().push(Invocation {
            args: request.args.to_vec(),
            listening: state.listening,
        });

        let chat_id = request.chat_id();
        match request.arg(1) {
            Some("listen") => Ok(Reply::one(Directive::text(chat_id, "more?")).listening(request.args)),
            Some("fail") => Err(anyhow::anyhow!("record exploded")),
            Some("noop") => Ok(Reply::done(vec![
                Directive::EditText {
                    chat_id,
                    target: Target::Message(MessageId(5)),
                    text: "same".to_string(),
                    markup: None,
                },
                Directive::text(chat_id, "after"),
            ])),
            Some("typed") => Ok(Reply::done(vec![
                Directive::text(chat_id, "a"),
                Directive::EditText {
                    chat_id,
                    target: Target::LastSent,
                    text: "a b".to_string(),
                    markup: None,
                },
            ])),
            _ => Ok(Reply::one(Directive::text(chat_id, format!("echo {}", request.args.join("|"))))),
        }
    }
}

pub async fn app_with(modules: Vec<Box<dyn Module>>) -> App {
    let db = Database::in_memory().await.unwrap();
    let registry = Registry::new(modules).unwrap();
    App::new(registry, db, "/start")
}

/// App with `/start` and `/record` recorder modules
pub async fn recorder_app() -> (App, Arc<Mutex<Vec<Invocation>>>) {
    let (start, _) = RecorderModule::new("/start");
    let (recorder, calls) = RecorderModule::new("/record");
    let app = app_with(vec![Box::new(start), Box::new(recorder)]).await;
    (app, calls)
}

pub fn text_update(chat_kind: ChatKind, text: &str) -> InboundUpdate {
    InboundUpdate::text(ChatId(CHAT), USER, chat_kind, MessageId(1), text)
}

pub fn private(text: &str) -> InboundUpdate {
    text_update(ChatKind::Private, text)
}

pub fn group(text: &str) -> InboundUpdate {
    text_update(ChatKind::Group, text)
}

pub fn callback(data: &str, message_id: i32) -> InboundUpdate {
    InboundUpdate {
        chat_id: ChatId(CHAT),
        user_id: USER,
        chat_kind: ChatKind::Private,
        message_id: MessageId(message_id),
        text: Some(data.to_string()),
        kind: UpdateKind::Callback {
            query_id: CallbackQueryId("query-1".to_string()),
            message_id: MessageId(message_id),
            has_photo: false,
        },
    }
}
