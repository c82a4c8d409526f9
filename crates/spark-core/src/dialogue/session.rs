//! Per-login session state

use std::fmt;

use crate::auth::{User, UserId};
use crate::chat::{ChatTurn, ConversationLog};
use crate::error::Result;
use crate::storage::Database;

/// Where a session is within a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    Recording,
    Composing,
    Dispatching,
    Recovering,
    Finalizing,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Recording => "recording",
            TurnPhase::Composing => "composing",
            TurnPhase::Dispatching => "dispatching",
            TurnPhase::Recovering => "recovering",
            TurnPhase::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

/// An authenticated user's session.
///
/// The transcript is a read-through copy of the conversation log, replaced
/// after every turn; the log stays authoritative.
#[derive(Debug, Clone)]
pub struct Session {
    user: User,
    display_name: Option<String>,
    pub(crate) transcript: Vec<ChatTurn>,
    pub(crate) phase: TurnPhase,
}

impl Session {
    /// Create a session whose display name is the username
    pub fn new(user: User) -> Self {
        let display_name = Some(user.username.clone());
        Self {
            user,
            display_name,
            transcript: Vec::new(),
            phase: TurnPhase::Idle,
        }
    }

    /// Override (or clear) the name used to address the user
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Reload the transcript from the conversation log
    pub async fn refresh(&mut self, db: &Database) -> Result<()> {
        self.transcript = ConversationLog::new(db).read_all(self.user.id).await?;
        Ok(())
    }
}
