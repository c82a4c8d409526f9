//! Credential store repository

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::password::{self, PasswordCheck};
use crate::error::{Error, Result};
use crate::storage::Database;

/// Identifier of a registered user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user (the password digest never leaves the store)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// Outcome of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered(UserId),
    UsernameTaken,
}

/// Outcome of a login attempt
///
/// Unknown usernames and wrong passwords both map to `Invalid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(User),
    Invalid,
}

/// Credential store for the `users` table
pub struct CredentialStore<'a> {
    db: &'a Database,
}

impl<'a> CredentialStore<'a> {
    /// Create a new credential store
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register a new user.
    ///
    /// A duplicate username is reported as `UsernameTaken`; the insert is a
    /// single statement so nothing is written in that case.
    pub async fn register(&self, username: &str, password: &str) -> Result<RegisterOutcome> {
        if username.trim().is_empty() {
            return Err(Error::InvalidInput("username must not be empty".to_string()));
        }

        let digest = hash_blocking(password.to_string()).await?;

        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(&digest)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await;

        match result {
            Ok(done) => {
                let id = UserId(done.last_insert_rowid());
                info!(user_id = %id, "Registered new user");
                Ok(RegisterOutcome::Registered(id))
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!("Registration rejected: username already exists");
                Ok(RegisterOutcome::UsernameTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify a login attempt
    pub async fn verify(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, username, password_hash FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(self.db.pool())
                .await?;

        let Some((id, username, stored)) = row else {
            debug!("Login rejected");
            return Ok(LoginOutcome::Invalid);
        };

        match verify_blocking(password.to_string(), stored).await? {
            PasswordCheck::Valid { needs_rehash } => {
                let user = User {
                    id: UserId(id),
                    username,
                };
                if needs_rehash {
                    self.upgrade_digest(user.id, password).await?;
                }
                debug!(user_id = %user.id, "Login accepted");
                Ok(LoginOutcome::Authenticated(user))
            }
            PasswordCheck::Invalid => {
                debug!("Login rejected");
                Ok(LoginOutcome::Invalid)
            }
        }
    }

    /// Get a user by ID
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id = ?")
                .bind(id.0)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(row.map(|(id, username)| User {
            id: UserId(id),
            username,
        }))
    }

    /// Get a user by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(row.map(|(id, username)| User {
            id: UserId(id),
            username,
        }))
    }

    /// Count rows holding a username (0 or 1 while the unique index holds)
    pub async fn count_by_username(&self, username: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(self.db.pool())
            .await?;

        Ok(count)
    }

    /// Number of registered users
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count)
    }

    /// Replace a legacy digest with an Argon2id hash
    async fn upgrade_digest(&self, id: UserId, password: &str) -> Result<()> {
        let digest = hash_blocking(password.to_string()).await?;

        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(&digest)
            .bind(id.0)
            .execute(self.db.pool())
            .await?;

        info!(user_id = %id, "Upgraded legacy password digest");
        Ok(())
    }
}

async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| Error::PasswordHash(format!("hashing task failed: {}", e)))?
}

async fn verify_blocking(password: String, stored: String) -> Result<PasswordCheck> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &stored))
        .await
        .map_err(|e| Error::PasswordHash(format!("verification task failed: {}", e)))
}
