//! Conversation log and context windows
//!
//! - `types`: chat turn and role types
//! - `log`: append-only per-user history in `chat_history`
//! - `window`: bounded slice of history forwarded to the model

pub mod log;
pub mod types;
pub mod window;

pub use log::ConversationLog;
pub use types::{ChatRole, ChatTurn};
pub use window::{DEFAULT_CONTEXT_WINDOW, build_window};
