//! Per-update processing: session resolution, dispatch, delivery

use tracing::{debug, info};

use crate::db::Database;
use crate::errors::BotError;
use crate::modules::Transition;
use crate::session::SessionStore;
use crate::tokenizer;
use crate::update::{InboundUpdate, UpdateKind};

use super::continuation::{self, Resolution};
use super::funnel::Funnel;
use super::outbound::Outbound;
use super::router::Registry;

/// Shared, immutable application state
pub struct App {
    pub registry: Registry,
    pub db: Database,
    pub sessions: SessionStore,
    /// Command that leaves the stored session as it is
    pub reset_command: String,
}

impl App {
    pub fn new(registry: Registry, db: Database, reset_command: impl Into<String>) -> Self {
        let sessions = db.sessions();
        Self {
            registry,
            db,
            sessions,
            reset_command: reset_command.into().to_lowercase(),
        }
    }
}

/// Handle one inbound update end to end
///
/// Only session storage failures are returned; every other error is turned
/// into a reply by the funnel.
pub async fn process_update(
    app: &App,
    outbound: &dyn Outbound,
    update: &InboundUpdate,
) -> Result<(), BotError> {
    let funnel = Funnel::new(outbound, update);
    let key = update.session_key();

    if let UpdateKind::Callback { query_id, .. } = &update.kind {
        funnel.acknowledge(query_id).await;
    }

    let cleaned = tokenizer::clean(update.text.as_deref().unwrap_or(""));

    let (text, continuing) = if tokenizer::is_command(&cleaned) {
        if tokenizer::dispatch_key(&cleaned).as_deref() != Some(app.reset_command.as_str()) {
            app.sessions.set(key, &cleaned, false).await?;
        }
        (cleaned, false)
    } else {
        let raw = update.text.as_deref().unwrap_or("");
        match continuation::resolve(&app.sessions, key, update.chat_kind, raw).await? {
            Resolution::Continue(text) => {
                debug!(chat_id = %update.chat_id, user_id = update.user_id, "Continuing open session");
                (tokenizer::clean(&text), true)
            }
            Resolution::Ignore | Resolution::Reject => {
                funnel.report(&BotError::EmptyInput).await;
                return Ok(());
            }
        }
    };

    let args = match app.registry.split(&text) {
        Ok(args) => args,
        Err(e) => {
            funnel.report(&BotError::from(e)).await;
            return Ok(());
        }
    };

    // A continuation is a new invocation: the module has to ask again to keep listening
    if continuing {
        app.sessions.set(key, &text, false).await?;
    }

    match app.registry.dispatch(args, update, &app.db).await {
        Ok(reply) => {
            if let Transition::Listen(tokens) = &reply.transition {
                app.sessions.set_tokens(key, tokens, true).await?;
            }
            funnel.deliver(reply.directives).await;
        }
        Err(err) => funnel.report(&err).await,
    }

    info!(chat_id = %update.chat_id, user_id = update.user_id, "Update processed");
    Ok(())
}
