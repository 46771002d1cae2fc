use anyhow::Result;
use hookbot::db::Database;
use hookbot::session::{SessionKey, SessionState};
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    /// Missing rows read as a closed, empty session
    #[tokio::test]
    async fn test_missing_session_reads_default() -> Result<()> {
        let db = Database::in_memory().await?;
        let state = db.sessions().get(SessionKey::new(1, 2)).await?;
        assert_eq!(state, SessionState::default());
        Ok(())
    }

    /// Writes overwrite both fields of the single row for a key
    #[tokio::test]
    async fn test_set_overwrites() -> Result<()> {
        let db = Database::in_memory().await?;
        let sessions = db.sessions();
        let key = SessionKey::new(-100123, 42);

        sessions.set(key, "/weathersg forecast24h", true).await?;
        sessions.set(key, "/catgpt", false).await?;

        let state = sessions.get(key).await?;
        assert!(!state.listening);
        assert_eq!(state.pending_command, "/catgpt");

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM UserSession")
            .fetch_one(db.pool())
            .await?;
        assert_eq!(rows, 1);
        Ok(())
    }

    /// Tokens with spaces and quotes survive a store and reload
    #[tokio::test]
    async fn test_set_tokens_keeps_token_boundaries() -> Result<()> {
        let db = Database::in_memory().await?;
        let sessions = db.sessions();
        let key = SessionKey::new(1, 1);
        let tokens = ["/shortcuts", "modify", "add", "my rain", "it's here", ""];

        sessions.set_tokens(key, &tokens, true).await?;

        let state = sessions.get(key).await?;
        assert!(state.listening);
        assert_eq!(state.pending_tokens()?, tokens.to_vec());
        Ok(())
    }

    /// Sessions persist in a database file across reopen
    #[tokio::test]
    async fn test_sessions_survive_reopen() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("data").join("data.db");
        let key = SessionKey::new(5, 6);

        {
            let db = Database::open(&path).await?;
            db.sessions().set(key, "/shortcuts modify", true).await?;
            db.pool().close().await;
        }

        let db = Database::open(&path).await?;
        let state = db.sessions().get(key).await?;
        assert!(state.listening);
        assert_eq!(state.pending_command, "/shortcuts modify");
        Ok(())
    }

    /// A closed pool surfaces as a storage error
    #[tokio::test]
    async fn test_closed_pool_errors() -> Result<()> {
        let db = Database::in_memory().await?;
        db.pool().close().await;
        assert!(db.sessions().get(SessionKey::new(1, 1)).await.is_err());
        Ok(())
    }
}
