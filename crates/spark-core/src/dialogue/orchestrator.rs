//! Dialogue orchestrator

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::prompt::{APOLOGY_MESSAGE, RoleLabels, question_prompt, with_system_prompt};
use super::session::{Session, TurnPhase};
use crate::auth::User;
use crate::chat::{ChatRole, ChatTurn, ConversationLog, DEFAULT_CONTEXT_WINDOW, build_window};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::{ModelClient, ModelTurn};
use crate::storage::Database;

/// Default bound on a single model call
const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of one user turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model answered; the assistant turn has been recorded
    Answered(ChatTurn),
    /// The model call failed; nothing but the question was recorded
    Apologized { reason: String },
}

impl TurnOutcome {
    /// Text to show the user
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Answered(turn) => &turn.content,
            TurnOutcome::Apologized { .. } => APOLOGY_MESSAGE,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, TurnOutcome::Answered(_))
    }
}

/// What gets sent to the model for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedRequest {
    pub context: Vec<ModelTurn>,
    pub prompt: String,
}

/// Coordinates the conversation log, context window, and model client
pub struct DialogueOrchestrator {
    db: Database,
    client: Arc<dyn ModelClient>,
    context_window: usize,
    timeout: Duration,
    labels: RoleLabels,
}

impl DialogueOrchestrator {
    pub fn new(db: Database, client: Arc<dyn ModelClient>) -> Self {
        Self {
            db,
            client,
            context_window: DEFAULT_CONTEXT_WINDOW,
            timeout: DEFAULT_MODEL_TIMEOUT,
            labels: RoleLabels::GEMINI,
        }
    }

    /// Create an orchestrator using the chat and LLM settings from `config`
    pub fn from_config(db: Database, client: Arc<dyn ModelClient>, config: &Config) -> Self {
        Self::new(db, client)
            .with_context_window(config.chat.context_window)
            .with_timeout(Duration::from_secs(config.llm.timeout_secs))
    }

    pub fn with_context_window(mut self, limit: usize) -> Self {
        self.context_window = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_role_labels(mut self, labels: RoleLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Open a session for an authenticated user, loading their history
    pub async fn start_session(&self, user: User) -> Result<Session> {
        let mut session = Session::new(user);
        session.refresh(&self.db).await?;
        debug!(
            user_id = %session.user_id(),
            turns = session.transcript().len(),
            "Session started"
        );
        Ok(session)
    }

    /// Build the model request for `question` given the turns that preceded it.
    ///
    /// The persona instruction is included only when `prior` is empty, i.e.
    /// the user has never asked anything before.
    pub fn compose(
        &self,
        prior: &[ChatTurn],
        display_name: Option<&str>,
        question: &str,
    ) -> ComposedRequest {
        let window = build_window(prior, self.context_window);

        let context = window
            .iter()
            .map(|turn| ModelTurn::new(self.labels.label(turn.role), turn.content.clone()))
            .collect();

        let prompt = question_prompt(display_name, question);
        let prompt = if window.is_empty() {
            with_system_prompt(&prompt)
        } else {
            prompt
        };

        ComposedRequest { context, prompt }
    }

    /// Run one user turn.
    ///
    /// Taking the session mutably keeps a single turn in flight per session.
    /// Model failures (including timeouts) come back as
    /// `TurnOutcome::Apologized`; storage failures are returned as errors.
    pub async fn handle_turn(&self, session: &mut Session, question: &str) -> Result<TurnOutcome> {
        if question.trim().is_empty() {
            return Err(Error::InvalidInput("question must not be empty".to_string()));
        }

        let result = self.run_turn(session, question).await;
        enter(session, TurnPhase::Idle);
        result
    }

    async fn run_turn(&self, session: &mut Session, question: &str) -> Result<TurnOutcome> {
        let user_id = session.user_id();
        let log = ConversationLog::new(&self.db);

        enter(session, TurnPhase::Recording);
        let recorded = log.append(user_id, ChatRole::User, question).await?;

        enter(session, TurnPhase::Composing);
        let history = log.read_all(user_id).await?;
        let prior: Vec<ChatTurn> = history
            .iter()
            .filter(|turn| turn.id != recorded.id)
            .cloned()
            .collect();
        let request = self.compose(&prior, session.display_name(), question);

        enter(session, TurnPhase::Dispatching);
        let reply = match tokio::time::timeout(
            self.timeout,
            self.client.send(&request.context, &request.prompt),
        )
        .await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Ok(_)) => Err(Error::LLMError("Empty response from model".to_string())),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout(self.timeout.as_secs())),
        };

        match reply {
            Ok(text) => {
                enter(session, TurnPhase::Finalizing);
                let answer = log.append(user_id, ChatRole::Assistant, &text).await?;
                session.refresh(&self.db).await?;
                debug!(user_id = %user_id, turn_id = answer.id, "Turn answered");
                Ok(TurnOutcome::Answered(answer))
            }
            Err(e) => {
                enter(session, TurnPhase::Recovering);
                warn!(user_id = %user_id, code = e.code(), error = %e, "Model call failed");
                session.transcript = history;
                Ok(TurnOutcome::Apologized {
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn enter(session: &mut Session, phase: TurnPhase) {
    debug!(user_id = %session.user_id(), from = %session.phase, to = %phase, "Turn phase");
    session.phase = phase;
}
