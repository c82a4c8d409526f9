//! Professor Spark Core Library
//!
//! This crate provides the core functionality for Professor Spark, including:
//! - Storage (SQLite pool + versioned migrations)
//! - Credential store (registration, login verification)
//! - Conversation log (append-only per-user chat history)
//! - Context window building for the language model
//! - LLM integration (Gemini API behind the `ModelClient` trait)
//! - Dialogue orchestration (one user turn at a time per session)

pub mod auth;
pub mod chat;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod llm;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::auth::{CredentialStore, LoginOutcome, RegisterOutcome, User, UserId};
    pub use crate::chat::{ChatRole, ChatTurn, ConversationLog, build_window};
    pub use crate::config::Config;
    pub use crate::dialogue::{DialogueOrchestrator, Session, TurnOutcome};
    pub use crate::error::{Error, Result};
    pub use crate::llm::{GeminiClient, ModelClient, ModelTurn};
    pub use crate::storage::Database;
}
