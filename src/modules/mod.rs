//! Command modules
//!
//! Each module owns one dispatch key and answers every invocation with a
//! [`Reply`]. Modules never touch the session store themselves; they say
//! whether they want to keep listening through [`Transition`].

use async_trait::async_trait;
use teloxide::types::ChatId;

use crate::bot::ui_builder::Responder;
use crate::db::Database;
use crate::directive::Directive;
use crate::update::InboundUpdate;

pub mod catgpt;
pub mod shortcuts;
pub mod start;
pub mod weather;

pub use catgpt::CatGptModule;
pub use shortcuts::{ScShowModule, ShortcutsModule};
pub use start::StartModule;
pub use weather::WeatherModule;

/// Key and description of a registered module
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInfo {
    pub key: String,
    pub description: String,
}

/// Session change a module asks for once it has handled an invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Close the session
    Done,
    /// Treat the next non-command message as more arguments to these tokens
    Listen(Vec<String>),
}

/// What a module hands back to the pipeline
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub directives: Vec<Directive>,
    pub transition: Transition,
}

impl Reply {
    pub fn done(directives: Vec<Directive>) -> Self {
        Self {
            directives,
            transition: Transition::Done,
        }
    }

    pub fn one(directive: Directive) -> Self {
        Self::done(vec![directive])
    }

    /// Keep listening for more arguments to `tokens`
    pub fn listening<S: AsRef<str>>(mut self, tokens: &[S]) -> Self {
        self.transition = Transition::Listen(tokens.iter().map(|t| t.as_ref().to_string()).collect());
        self
    }
}

/// Everything a module gets to see about one invocation
#[derive(Clone, Copy, Debug)]
pub struct Request<'a> {
    /// Tokens of the invocation; `args[0]` is the lowercased dispatch key
    pub args: &'a [String],
    pub update: &'a InboundUpdate,
    pub db: &'a Database,
    /// All registered modules, in registration order
    pub catalog: &'a [CommandInfo],
}

impl<'a> Request<'a> {
    pub fn argc(&self) -> usize {
        self.args.len()
    }

    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).map(String::as_str)
    }

    /// The first `n` tokens, or all of them when there are fewer
    pub fn head(&self, n: usize) -> &'a [String] {
        &self.args[..n.min(self.args.len())]
    }

    pub fn chat_id(&self) -> ChatId {
        self.update.chat_id
    }

    pub fn user_id(&self) -> i64 {
        self.update.user_id
    }

    /// Reply builder labelled with the full invocation
    pub fn responder(&self) -> Responder {
        Responder::new(self.update.chat_id, self.update.reply_target(), self.args)
    }
}

/// A command handler registered under one dispatch key
#[async_trait]
pub trait Module: Send + Sync {
    /// Dispatch key, including the leading `/`
    fn key(&self) -> &str;

    fn description(&self) -> &str;

    /// Whether this invocation is free text split on whitespace, without quoting rules
    ///
    /// `words` is the whitespace-split command text.
    fn takes_plain_words(&self, _words: &[&str]) -> bool {
        false
    }

    async fn handle(&self, request: &Request<'_>) -> anyhow::Result<Reply>;
}

/// The bot's modules in registration order
pub fn default_modules(http: reqwest::Client) -> Vec<Box<dyn Module>> {
    vec![
        Box::new(StartModule),
        Box::new(WeatherModule::new(http.clone())),
        Box::new(ShortcutsModule),
        Box::new(ScShowModule),
        Box::new(CatGptModule::new(http)),
    ]
}
