//! Decides what a non-command update means given the stored session

use crate::session::{SessionKey, SessionState, SessionStore};
use crate::update::ChatKind;

/// Outcome for an update whose text is not a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Dispatch this text as the pending command plus the new input
    Continue(String),
    /// Shared chat with no open session: say nothing
    Ignore,
    /// Private chat with no open session: tell the user
    Reject,
}

/// Pure decision over an already loaded session
pub fn decide(state: &SessionState, chat_kind: ChatKind, text: &str) -> Resolution {
    if state.listening {
        Resolution::Continue(format!("{} {}", state.pending_command, text))
    } else if chat_kind.is_shared() {
        Resolution::Ignore
    } else {
        Resolution::Reject
    }
}

/// Load the session for `key` and decide
pub async fn resolve(
    store: &SessionStore,
    key: SessionKey,
    chat_kind: ChatKind,
    text: &str,
) -> Result<Resolution, sqlx::Error> {
    let state = store.get(key).await?;
    Ok(decide(&state, chat_kind, text))
}
