//! Dialogue orchestration
//!
//! Drives one user turn at a time: record the question, compose a bounded
//! context window, ask the model, record the answer. A failed model call
//! degrades to a fixed apology and leaves only the question in the log.

pub mod orchestrator;
pub mod prompt;
pub mod session;

pub use orchestrator::{ComposedRequest, DialogueOrchestrator, TurnOutcome};
pub use prompt::{APOLOGY_MESSAGE, RoleLabels, SYSTEM_PROMPT};
pub use session::{Session, TurnPhase};
