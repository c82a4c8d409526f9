//! End-to-end dialogue tests against an in-memory database and scripted model clients

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use spark_core::auth::{CredentialStore, LoginOutcome, RegisterOutcome, User, UserId};
use spark_core::chat::{ChatRole, ConversationLog};
use spark_core::dialogue::{APOLOGY_MESSAGE, DialogueOrchestrator, SYSTEM_PROMPT, TurnOutcome, TurnPhase};
use spark_core::llm::{ModelClient, ModelTurn};
use spark_core::storage::Database;
use spark_core::{Error, Result};

/// A request captured by `ScriptedClient`
#[derive(Debug, Clone)]
struct Captured {
    context: Vec<ModelTurn>,
    prompt: String,
}

/// Replies with a fixed answer and records every request
#[derive(Default)]
struct ScriptedClient {
    reply: String,
    requests: Mutex<Vec<Captured>>,
}

impl ScriptedClient {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn send(&self, context: &[ModelTurn], prompt: &str) -> Result<String> {
        self.requests.lock().unwrap().push(Captured {
            context: context.to_vec(),
            prompt: prompt.to_string(),
        });
        Ok(self.reply.clone())
    }
}

struct FailingClient;

#[async_trait]
impl ModelClient for FailingClient {
    async fn send(&self, _context: &[ModelTurn], _prompt: &str) -> Result<String> {
        Err(Error::RateLimited(27))
    }
}

struct SlowClient;

#[async_trait]
impl ModelClient for SlowClient {
    async fn send(&self, _context: &[ModelTurn], _prompt: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".to_string())
    }
}

struct BlankClient;

#[async_trait]
impl ModelClient for BlankClient {
    async fn send(&self, _context: &[ModelTurn], _prompt: &str) -> Result<String> {
        Ok("   ".to_string())
    }
}

async fn register(db: &Database, username: &str, password: &str) -> User {
    let store = CredentialStore::new(db);
    let outcome = store.register(username, password).await.unwrap();
    assert!(matches!(outcome, RegisterOutcome::Registered(_)));

    match store.verify(username, password).await.unwrap() {
        LoginOutcome::Authenticated(user) => user,
        LoginOutcome::Invalid => panic!("fresh registration should authenticate"),
    }
}

#[tokio::test]
async fn test_register_duplicate_and_login() {
    let db = Database::in_memory().await.unwrap();
    let store = CredentialStore::new(&db);

    let first = store.register("alice", "sciencefan1").await.unwrap();
    assert!(matches!(first, RegisterOutcome::Registered(_)));

    let second = store.register("alice", "other-password").await.unwrap();
    assert_eq!(second, RegisterOutcome::UsernameTaken);
    assert_eq!(store.count_by_username("alice").await.unwrap(), 1);

    assert!(matches!(
        store.verify("alice", "sciencefan1").await.unwrap(),
        LoginOutcome::Authenticated(User { ref username, .. }) if username == "alice"
    ));
    assert_eq!(
        store.verify("alice", "wrong").await.unwrap(),
        LoginOutcome::Invalid
    );
}

#[tokio::test]
async fn test_answered_turn_records_question_then_answer() {
    let db = Database::in_memory().await.unwrap();
    let user = register(&db, "alice", "sciencefan1").await;
    let client = ScriptedClient::replying("Gravity is the pull between masses.");
    let orch = DialogueOrchestrator::new(db.clone(), client.clone());

    let mut session = orch.start_session(user.clone()).await.unwrap();
    assert!(session.transcript().is_empty());

    let outcome = orch.handle_turn(&mut session, "What is gravity?").await.unwrap();
    assert!(outcome.is_answered());
    assert_eq!(outcome.text(), "Gravity is the pull between masses.");
    assert_eq!(session.phase(), TurnPhase::Idle);

    let history = ConversationLog::new(&db).read_all(user.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, ChatRole::User);
    assert_eq!(history[0].content, "What is gravity?");
    assert_eq!(history[1].role, ChatRole::Assistant);
    assert_eq!(history[1].content, "Gravity is the pull between masses.");
    assert_eq!(session.transcript(), history.as_slice());

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].context.is_empty());
    assert!(requests[0].prompt.starts_with(SYSTEM_PROMPT));
    assert!(
        requests[0]
            .prompt
            .ends_with("My name is alice. My question is: What is gravity?")
    );
}

#[tokio::test]
async fn test_failed_turn_keeps_only_question() {
    let db = Database::in_memory().await.unwrap();
    let user = register(&db, "alice", "sciencefan1").await;
    let orch = DialogueOrchestrator::new(db.clone(), Arc::new(FailingClient));

    let mut session = orch.start_session(user.clone()).await.unwrap();
    let outcome = orch.handle_turn(&mut session, "What is gravity?").await.unwrap();

    assert!(matches!(outcome, TurnOutcome::Apologized { .. }));
    assert_eq!(outcome.text(), APOLOGY_MESSAGE);
    assert_eq!(session.phase(), TurnPhase::Idle);

    let history = ConversationLog::new(&db).read_all(user.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, ChatRole::User);
    assert_eq!(session.transcript().len(), 1);
}

#[tokio::test]
async fn test_timeout_degrades_to_apology() {
    let db = Database::in_memory().await.unwrap();
    let user = register(&db, "alice", "sciencefan1").await;
    let orch = DialogueOrchestrator::new(db.clone(), Arc::new(SlowClient))
        .with_timeout(Duration::from_millis(50));

    let mut session = orch.start_session(user.clone()).await.unwrap();
    let outcome = orch.handle_turn(&mut session, "Why is the sky blue?").await.unwrap();

    assert_eq!(outcome.text(), APOLOGY_MESSAGE);
    assert_eq!(ConversationLog::new(&db).count(user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_blank_reply_degrades_to_apology() {
    let db = Database::in_memory().await.unwrap();
    let user = register(&db, "alice", "sciencefan1").await;
    let orch = DialogueOrchestrator::new(db.clone(), Arc::new(BlankClient));

    let mut session = orch.start_session(user.clone()).await.unwrap();
    let outcome = orch.handle_turn(&mut session, "What is a cell?").await.unwrap();

    assert!(!outcome.is_answered());
    assert_eq!(ConversationLog::new(&db).count(user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_system_prompt_only_on_first_ever_question() {
    let db = Database::in_memory().await.unwrap();
    let user = register(&db, "alice", "sciencefan1").await;
    let client = ScriptedClient::replying("Great question!");
    let orch = DialogueOrchestrator::new(db.clone(), client.clone());

    let mut session = orch.start_session(user.clone()).await.unwrap();
    orch.handle_turn(&mut session, "What is gravity?").await.unwrap();
    orch.handle_turn(&mut session, "And friction?").await.unwrap();

    // A later login sees the stored history and does not get the persona again
    let mut again = orch.start_session(user.clone()).await.unwrap();
    assert_eq!(again.transcript().len(), 4);
    orch.handle_turn(&mut again, "What is light?").await.unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].prompt.starts_with(SYSTEM_PROMPT));
    assert!(!requests[1].prompt.contains("Professor Spark"));
    assert!(!requests[2].prompt.contains("Professor Spark"));

    assert_eq!(
        requests[1].context,
        vec![
            ModelTurn::new("user", "What is gravity?"),
            ModelTurn::new("model", "Great question!"),
        ]
    );
    assert_eq!(requests[2].context.len(), 4);
}

#[tokio::test]
async fn test_context_window_is_bounded() {
    let db = Database::in_memory().await.unwrap();
    let user = register(&db, "alice", "sciencefan1").await;
    let client = ScriptedClient::replying("ok");
    let orch = DialogueOrchestrator::new(db.clone(), client.clone()).with_context_window(4);

    let mut session = orch.start_session(user.clone()).await.unwrap();
    for i in 0..5 {
        orch.handle_turn(&mut session, &format!("question {}", i))
            .await
            .unwrap();
    }

    let requests = client.requests();
    let last = requests.last().unwrap();
    let texts: Vec<&str> = last.context.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["question 2", "ok", "question 3", "ok"]);
    assert_eq!(last.prompt, "My name is alice. My question is: question 4");
}

#[tokio::test]
async fn test_histories_are_per_user() {
    let db = Database::in_memory().await.unwrap();
    let alice = register(&db, "alice", "sciencefan1").await;
    let bob = register(&db, "bob", "chemistry42").await;
    let client = ScriptedClient::replying("ok");
    let orch = DialogueOrchestrator::new(db.clone(), client.clone());

    let mut alice_session = orch.start_session(alice.clone()).await.unwrap();
    orch.handle_turn(&mut alice_session, "What is gravity?").await.unwrap();

    let mut bob_session = orch.start_session(bob.clone()).await.unwrap();
    assert!(bob_session.transcript().is_empty());
    orch.handle_turn(&mut bob_session, "What is an atom?").await.unwrap();

    // Bob's first question still gets the persona and none of Alice's turns
    let requests = client.requests();
    assert!(requests[1].context.is_empty());
    assert!(requests[1].prompt.starts_with(SYSTEM_PROMPT));

    let log = ConversationLog::new(&db);
    assert_eq!(log.count(alice.id).await.unwrap(), 2);
    assert_eq!(log.count(bob.id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_blank_question_is_rejected() {
    let db = Database::in_memory().await.unwrap();
    let user = register(&db, "alice", "sciencefan1").await;
    let client = ScriptedClient::replying("ok");
    let orch = DialogueOrchestrator::new(db.clone(), client.clone());

    let mut session = orch.start_session(user.clone()).await.unwrap();
    let err = orch.handle_turn(&mut session, "   ").await.unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(client.requests().is_empty());
    assert_eq!(ConversationLog::new(&db).count(user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_question_is_recorded_as_given() {
    let db = Database::in_memory().await.unwrap();
    let user = register(&db, "alice", "sciencefan1").await;
    let client = ScriptedClient::replying("ok");
    let orch = DialogueOrchestrator::new(db.clone(), client.clone());

    let question = "  What is a prism?\n  (with examples)  ";
    let mut session = orch.start_session(user.clone()).await.unwrap();
    orch.handle_turn(&mut session, question).await.unwrap();

    let history = ConversationLog::new(&db).read_all(user.id).await.unwrap();
    assert_eq!(history[0].content, question);
    assert!(client.requests()[0].prompt.ends_with(question));
}

#[tokio::test]
async fn test_unknown_user_surfaces_storage_error() {
    let db = Database::in_memory().await.unwrap();
    let client = ScriptedClient::replying("ok");
    let orch = DialogueOrchestrator::new(db.clone(), client.clone());

    let ghost = User {
        id: UserId(999),
        username: "ghost".to_string(),
    };
    let mut session = orch.start_session(ghost).await.unwrap();
    let err = orch.handle_turn(&mut session, "Hello?").await.unwrap_err();

    assert!(matches!(err, Error::DatabaseError(_)));
    assert_eq!(session.phase(), TurnPhase::Idle);
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_display_name_override() {
    let db = Database::in_memory().await.unwrap();
    let user = register(&db, "alice", "sciencefan1").await;
    let client = ScriptedClient::replying("ok");
    let orch = DialogueOrchestrator::new(db.clone(), client.clone());

    let mut session = orch
        .start_session(user)
        .await
        .unwrap()
        .with_display_name(None);
    orch.handle_turn(&mut session, "What is heat?").await.unwrap();

    let requests = client.requests();
    assert!(
        requests[0]
            .prompt
            .ends_with("I haven't provided my name. My question is: What is heat?")
    );
}
