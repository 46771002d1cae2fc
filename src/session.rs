//! Per-(chat, user) conversation state.
//!
//! A session remembers the last command a user issued in a chat and whether
//! the bot is listening for more arguments to it. Rows are overwritten on
//! every write and never deleted; closing a session means writing it back
//! with `listening = false`.

use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::errors::ParseError;
use crate::tokenizer;

/// Identifies one session row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat_id: i64,
    pub user_id: i64,
}

impl SessionKey {
    pub fn new(chat_id: i64, user_id: i64) -> Self {
        Self { chat_id, user_id }
    }
}

/// Stored state of a session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub listening: bool,
    pub pending_command: String,
}

impl SessionState {
    /// The stored command split back into tokens
    pub fn pending_tokens(&self) -> Result<Vec<String>, ParseError> {
        tokenizer::tokenize(&self.pending_command)
    }
}

/// SQLite-backed session store
#[derive(Clone, Debug)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a session; a missing row reads as `(false, "")`
    pub async fn get(&self, key: SessionKey) -> Result<SessionState, sqlx::Error> {
        let row: Option<(bool, String)> = sqlx::query_as(
            "SELECT listening, command FROM UserSession WHERE chat_id = ?1 AND user_id = ?2",
        )
        .bind(key.chat_id)
        .bind(key.user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|(listening, pending_command)| SessionState {
                listening,
                pending_command,
            })
            .unwrap_or_default())
    }

    /// Insert or overwrite a session
    pub async fn set(
        &self,
        key: SessionKey,
        command: &str,
        listening: bool,
    ) -> Result<(), sqlx::Error> {
        debug!(
            chat_id = key.chat_id,
            user_id = key.user_id,
            listening,
            command,
            "Writing session state"
        );

        sqlx::query(
            "INSERT INTO UserSession (chat_id, user_id, command, listening)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(chat_id, user_id)
             DO UPDATE SET command = excluded.command, listening = excluded.listening",
        )
        .bind(key.chat_id)
        .bind(key.user_id)
        .bind(command)
        .bind(listening)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a token sequence, quoting tokens so they read back unchanged
    pub async fn set_tokens<S: AsRef<str>>(
        &self,
        key: SessionKey,
        tokens: &[S],
        listening: bool,
    ) -> Result<(), sqlx::Error> {
        self.set(key, &tokenizer::join(tokens), listening).await
    }
}
