//! Model client trait

use async_trait::async_trait;

use super::types::ModelTurn;
use crate::error::Result;

/// A generative-text service that answers a prompt given prior turns.
///
/// Roles in `context` are already in the provider's vocabulary.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the ordered context plus a new prompt; returns the completion text
    async fn send(&self, context: &[ModelTurn], prompt: &str) -> Result<String>;
}
