//! # Error Types Module
//!
//! This module defines the error taxonomy of the dispatch core. Every failure
//! that can happen while handling one update is one of these variants, and the
//! response funnel decides per variant what (if anything) the user sees.

use teloxide::{ApiError, RequestError};
use thiserror::Error;

/// Substring Telegram uses when an edit would leave a message unchanged.
pub const NOT_MODIFIED_SIGNATURE: &str = "message is not modified";

/// Tokenization failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A quote was opened and never closed
    #[error("No closing quotation ({quote})")]
    UnclosedQuote { quote: char },
    /// The text ended right after a backslash
    #[error("No escaped character")]
    TrailingEscape,
}

/// Errors raised while processing a single update
#[derive(Debug, Error)]
pub enum BotError {
    /// Malformed quoting in the command text
    #[error("parsing error: {0}")]
    Parse(#[from] ParseError),
    /// The dispatch key has no registered module
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// Nothing to dispatch: no command and no open session
    #[error("empty input")]
    EmptyInput,
    /// A module handler failed
    #[error("{0:#}")]
    Module(anyhow::Error),
    /// The Bot API rejected a directive
    #[error(transparent)]
    Delivery(#[from] RequestError),
    /// An edit directive pointed at the previous message but nothing was sent yet
    #[error("no previously sent message to edit")]
    MissingEditTarget,
    /// The session store could not be read or written
    #[error("session storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl BotError {
    /// Whether this error only says the target message already has the requested content.
    pub fn is_message_not_modified(&self) -> bool {
        match self {
            BotError::Delivery(RequestError::Api(ApiError::MessageNotModified)) => true,
            other => other.to_string().contains(NOT_MODIFIED_SIGNATURE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_modified_variant_is_detected() {
        let err = BotError::Delivery(RequestError::Api(ApiError::MessageNotModified));
        assert!(err.is_message_not_modified());
    }

    #[test]
    fn test_not_modified_signature_in_message_is_detected() {
        let err = BotError::Delivery(RequestError::Api(ApiError::Unknown(
            "Bad Request: message is not modified: specified new message content".to_string(),
        )));
        assert!(err.is_message_not_modified());

        let err = BotError::Module(anyhow::anyhow!("edit failed: message is not modified"));
        assert!(err.is_message_not_modified());
    }

    #[test]
    fn test_other_errors_are_not_noops() {
        let err = BotError::Delivery(RequestError::Api(ApiError::BotBlocked));
        assert!(!err.is_message_not_modified());
        assert!(!BotError::EmptyInput.is_message_not_modified());
        assert!(!BotError::UnknownCommand("/x".to_string()).is_message_not_modified());
    }

    #[test]
    fn test_error_message_formatting() {
        let err = BotError::from(ParseError::UnclosedQuote { quote: '"' });
        assert_eq!(err.to_string(), "parsing error: No closing quotation (\")");

        let err = BotError::UnknownCommand("/nope".to_string());
        assert_eq!(err.to_string(), "unknown command: /nope");
    }
}
