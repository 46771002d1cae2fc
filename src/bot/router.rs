//! Dispatch router: maps the first token of a command to its module

use std::collections::HashMap;
use teloxide::types::BotCommand;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::Database;
use crate::errors::{BotError, ParseError};
use crate::modules::{CommandInfo, Module, Reply, Request};
use crate::tokenizer::{self, COMMAND_PREFIX};
use crate::update::InboundUpdate;

/// Reasons a module list cannot be registered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("module key '{0}' must start with '/'")]
    MissingPrefix(String),
    #[error("module key '{0}' is registered more than once")]
    Duplicate(String),
}

/// Immutable set of registered modules
pub struct Registry {
    modules: Vec<Box<dyn Module>>,
    index: HashMap<String, usize>,
    catalog: Vec<CommandInfo>,
}

impl Registry {
    /// Register modules in order; keys are case-insensitive
    pub fn new(modules: Vec<Box<dyn Module>>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(modules.len());
        let mut catalog = Vec::with_capacity(modules.len());

        for (position, module) in modules.iter().enumerate() {
            let key = module.key().to_lowercase();
            if !key.starts_with(COMMAND_PREFIX) || key.len() == COMMAND_PREFIX.len_utf8() {
                return Err(RegistryError::MissingPrefix(module.key().to_string()));
            }
            if index.insert(key.clone(), position).is_some() {
                return Err(RegistryError::Duplicate(key));
            }
            catalog.push(CommandInfo {
                key,
                description: module.description().to_string(),
            });
        }

        info!(count = catalog.len(), "Registered modules");
        Ok(Self {
            modules,
            index,
            catalog,
        })
    }

    pub fn lookup(&self, key: &str) -> Option<&dyn Module> {
        self.index
            .get(&key.to_lowercase())
            .map(|&position| self.modules[position].as_ref())
    }

    pub fn catalog(&self) -> &[CommandInfo] {
        &self.catalog
    }

    /// Command menu entries for `setMyCommands`
    pub fn bot_commands(&self) -> Vec<BotCommand> {
        self.catalog
            .iter()
            .map(|info| BotCommand::new(info.key.trim_start_matches(COMMAND_PREFIX), info.description.clone()))
            .collect()
    }

    /// Split command text into arguments
    ///
    /// Shell quoting applies unless the addressed module takes plain words.
    pub fn split(&self, text: &str) -> Result<Vec<String>, ParseError> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let plain = words
            .first()
            .and_then(|key| self.lookup(key))
            .is_some_and(|module| module.takes_plain_words(&words));

        if plain {
            Ok(words.into_iter().map(str::to_string).collect())
        } else {
            tokenizer::tokenize(text)
        }
    }

    /// Route `args` to the module named by `args[0]`
    pub async fn dispatch(
        &self,
        mut args: Vec<String>,
        update: &InboundUpdate,
        db: &Database,
    ) -> Result<Reply, BotError> {
        let Some(first) = args.first_mut() else {
            return Err(BotError::EmptyInput);
        };
        *first = first.to_lowercase();

        let module = self
            .lookup(first)
            .ok_or_else(|| BotError::UnknownCommand(first.clone()))?;

        debug!(
            chat_id = %update.chat_id,
            user_id = update.user_id,
            module = module.key(),
            argc = args.len(),
            "Dispatching command"
        );

        let request = Request {
            args: &args,
            update,
            db,
            catalog: &self.catalog,
        };
        module.handle(&request).await.map_err(BotError::Module)
    }
}
