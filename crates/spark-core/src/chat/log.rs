//! Conversation log repository
//!
//! Append-only per-user chat history. Rows are never updated or deleted.

use chrono::Utc;
use sqlx::Row;

use super::types::{ChatRole, ChatTurn};
use crate::auth::UserId;
use crate::error::{Error, Result};
use crate::storage::Database;

const SELECT_TURN: &str = "SELECT id, user_id, role, content, timestamp FROM chat_history";

/// Conversation log for database operations
pub struct ConversationLog<'a> {
    db: &'a Database,
}

impl<'a> ConversationLog<'a> {
    /// Create a new conversation log
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append one turn for a user.
    ///
    /// The stored timestamp never precedes the user's latest turn, so a
    /// clock step backwards cannot reorder history. The clamp and the insert
    /// are one statement, which takes the write lock up front; concurrent
    /// appends for the same user wait on the busy timeout instead of failing.
    /// Fails with a database error if `user_id` does not reference an
    /// existing user.
    pub async fn append(&self, user_id: UserId, role: ChatRole, content: &str) -> Result<ChatTurn> {
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO chat_history (user_id, role, content, timestamp)
            SELECT ?, ?, ?, MAX(?, COALESCE(
                (SELECT MAX(timestamp) FROM chat_history WHERE user_id = ?),
                ?
            ))
            RETURNING id, user_id, role, content, timestamp
            "#,
        )
        .bind(user_id.0)
        .bind(role.as_str())
        .bind(content)
        .bind(now)
        .bind(user_id.0)
        .bind(now)
        .fetch_one(self.db.pool())
        .await?;

        let turn = row_to_turn(row)?;

        tracing::debug!(user_id = %user_id, turn_id = turn.id, role = %role, "Appended chat turn");
        Ok(turn)
    }

    /// Every turn for a user, oldest first (ties broken by row id)
    pub async fn read_all(&self, user_id: UserId) -> Result<Vec<ChatTurn>> {
        let rows = sqlx::query(&format!(
            "{} WHERE user_id = ? ORDER BY timestamp ASC, id ASC",
            SELECT_TURN
        ))
        .bind(user_id.0)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(row_to_turn).collect()
    }

    /// The most recent `limit` turns for a user, oldest first
    pub async fn list_recent(&self, user_id: UserId, limit: usize) -> Result<Vec<ChatTurn>> {
        let rows = sqlx::query(&format!(
            "{} WHERE user_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
            SELECT_TURN
        ))
        .bind(user_id.0)
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        let mut turns = rows.into_iter().map(row_to_turn).collect::<Result<Vec<_>>>()?;
        turns.reverse();
        Ok(turns)
    }

    /// Count turns for a user
    pub async fn count(&self, user_id: UserId) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_history WHERE user_id = ?")
            .bind(user_id.0)
            .fetch_one(self.db.pool())
            .await?;

        Ok(count)
    }
}

fn row_to_turn(row: sqlx::sqlite::SqliteRow) -> Result<ChatTurn> {
    let role: String = row.try_get("role")?;
    let role = ChatRole::parse(&role)
        .ok_or_else(|| Error::Other(format!("Unknown chat role in history: {}", role)))?;

    Ok(ChatTurn {
        id: row.try_get("id")?,
        user_id: UserId(row.try_get("user_id")?),
        role,
        content: row.try_get("content")?,
        timestamp: row.try_get("timestamp")?,
    })
}
