//! Professor Spark CLI - science mentor chat in the terminal

mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use spark_core::auth::{
    CredentialStore, LoginOutcome, RegisterOutcome, User, validate_new_password,
};
use spark_core::chat::{ChatRole, ChatTurn, ConversationLog, build_window};
use spark_core::config::Config;
use spark_core::dialogue::{DialogueOrchestrator, Session, TurnOutcome};
use spark_core::llm::GeminiClient;
use spark_core::storage::{Database, DatabaseConfig};
use tracing::{debug, warn};

use terminal::Terminal;

const ASSISTANT_NAME: &str = "Professor Spark";

#[derive(Parser)]
#[command(name = "spark")]
#[command(author, version, about = "Chat with Professor Spark, your science mentor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file (overrides storage.database_path)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register {
        /// Username
        username: String,
    },

    /// Log in and chat with Professor Spark
    Chat {
        /// Username
        username: String,
    },

    /// Log in and print your conversation history
    History {
        /// Username
        username: String,
        /// Only show the most recent turns
        #[arg(short, long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        limit: Option<usize>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

/// Commands understood inside the chat REPL
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Ask(&'a str),
    History,
    Logout,
    Quit,
    Unknown(&'a str),
    Blank,
}

impl<'a> ReplCommand<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => ReplCommand::Blank,
            "/history" => ReplCommand::History,
            "/logout" => ReplCommand::Logout,
            "/quit" | "/exit" => ReplCommand::Quit,
            command if command.starts_with('/') => ReplCommand::Unknown(command),
            _ => ReplCommand::Ask(line),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so they never interleave with the conversation
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("spark=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Register { username } => {
            let config = Config::load()?;
            let db = open_database(&config, cli.database.as_ref()).await?;
            cmd_register(&db, &config, &username, cli.quiet).await
        }

        Commands::Chat { username } => cmd_chat(cli.database.as_ref(), &username, cli.quiet).await,

        Commands::History { username, limit } => {
            let config = Config::load()?;
            let db = open_database(&config, cli.database.as_ref()).await?;
            cmd_history(&db, &username, limit, cli.quiet).await
        }

        Commands::Config { action } => cmd_config(action, cli.quiet),

        Commands::Doctor => cmd_doctor(cli.database.as_ref(), cli.quiet).await,
    }
}

async fn open_database(config: &Config, override_path: Option<&PathBuf>) -> anyhow::Result<Database> {
    let path = override_path
        .cloned()
        .unwrap_or_else(|| config.storage.resolved_database_path());
    debug!(path = %path.display(), "Opening database");
    Database::new(DatabaseConfig::with_path(path)).await
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_register(
    db: &Database,
    config: &Config,
    username: &str,
    quiet: bool,
) -> anyhow::Result<()> {
    let username = username.trim();
    if username.is_empty() {
        return Err(anyhow!("Please enter a username and password."));
    }

    let mut term = Terminal::new()?;
    let password = term.read_password("Password: ")?;
    let confirmation = term.read_password("Confirm password: ")?;

    if password.is_empty() {
        return Err(anyhow!("Please enter a username and password."));
    }
    validate_new_password(&password, &confirmation, config.chat.min_password_length)
        .map_err(|rejection| anyhow!("{}", rejection))?;

    match CredentialStore::new(db).register(username, &password).await? {
        RegisterOutcome::Registered(_) => {
            if !quiet {
                println!("Registration successful! Please log in.");
                println!("\nStart chatting with: spark chat {}", username);
            }
            Ok(())
        }
        RegisterOutcome::UsernameTaken => Err(anyhow!(
            "Username '{}' already exists. Please choose another.",
            username
        )),
    }
}

async fn login(db: &Database, term: &mut Terminal, username: &str) -> anyhow::Result<User> {
    let password = term.read_password("Password: ")?;

    match CredentialStore::new(db).verify(username.trim(), &password).await? {
        LoginOutcome::Authenticated(user) => Ok(user),
        LoginOutcome::Invalid => Err(anyhow!("Invalid username or password.")),
    }
}

/// How a REPL run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplExit {
    Logout,
    Quit,
}

async fn cmd_chat(database: Option<&PathBuf>, username: &str, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;

    // Refuse to start without a model key, before asking for a password
    let api_key = config.llm.require_api_key()?;

    let db = open_database(&config, database).await?;
    let mut term = Terminal::new()?;
    let mut user = login(&db, &mut term, username).await?;

    let client = GeminiClient::new(config.llm.clone(), api_key)?;
    let orchestrator = DialogueOrchestrator::from_config(db, Arc::new(client), &config);

    loop {
        let mut session = orchestrator.start_session(user).await?;

        if !quiet {
            println!("Login successful! Welcome, {}.", session.user().username);
            if session.transcript().is_empty() {
                println!("Ask {} any science question.", ASSISTANT_NAME);
            } else {
                println!("\nYour recent conversation:");
                print_turns(build_window(session.transcript(), config.chat.context_window));
            }
            println!("\nCommands: /history, /logout, /quit\n");
        }

        let exit = run_repl(&orchestrator, &mut session, &mut term, quiet).await?;

        if !quiet {
            println!("Goodbye, {}!", session.user().username);
        }
        drop(session);

        if exit == ReplExit::Quit {
            return Ok(());
        }

        if !quiet {
            println!("Logged out.\n");
        }
        match login_prompt(orchestrator.database(), &mut term).await? {
            Some(next) => user = next,
            None => return Ok(()),
        }
    }
}

/// Ask for credentials until a login succeeds; `None` when input ends
async fn login_prompt(db: &Database, term: &mut Terminal) -> anyhow::Result<Option<User>> {
    loop {
        let Some(username) = term.read_line("Username: ")? else {
            return Ok(None);
        };
        if username.trim().is_empty() {
            continue;
        }

        match login(db, term, &username).await {
            Ok(user) => return Ok(Some(user)),
            Err(e) => println!("{}", e),
        }
    }
}

async fn run_repl(
    orchestrator: &DialogueOrchestrator,
    session: &mut Session,
    term: &mut Terminal,
    quiet: bool,
) -> anyhow::Result<ReplExit> {
    let prompt = format!("{}> ", session.user().username);

    while let Some(line) = term.read_line(&prompt)? {
        match ReplCommand::parse(&line) {
            ReplCommand::Blank => continue,
            ReplCommand::History => {
                if session.transcript().is_empty() {
                    println!("No conversation yet.");
                } else {
                    print_turns(session.transcript());
                }
            }
            ReplCommand::Logout => return Ok(ReplExit::Logout),
            ReplCommand::Quit => return Ok(ReplExit::Quit),
            ReplCommand::Unknown(command) => {
                println!("Unknown command '{}'. Try /history, /logout, or /quit.", command);
            }
            ReplCommand::Ask(question) => {
                term.remember(question);
                if !quiet {
                    println!("{} is thinking...", ASSISTANT_NAME);
                }
                match orchestrator.handle_turn(session, question).await {
                    Ok(outcome) => {
                        if let TurnOutcome::Apologized { reason } = &outcome {
                            warn!(%reason, "Answer unavailable");
                        }
                        println!("{}: {}\n", ASSISTANT_NAME, outcome.text());
                    }
                    Err(e) => {
                        warn!(code = e.code(), error = %e, "Turn failed");
                        println!("{}\n", describe_turn_error(&e));
                    }
                }
            }
        }
    }

    Ok(ReplExit::Quit)
}

/// Inline message for a turn that failed outside the model call
fn describe_turn_error(err: &spark_core::Error) -> String {
    match err.suggestion() {
        Some(suggestion) => format!("Error [{}]: {}\n  Try: {}", err.code(), err, suggestion),
        None => format!("Error [{}]: {}", err.code(), err),
    }
}

async fn cmd_history(
    db: &Database,
    username: &str,
    limit: Option<usize>,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut term = Terminal::new()?;
    let user = login(db, &mut term, username).await?;

    let log = ConversationLog::new(db);
    let turns = match limit {
        Some(limit) => log.list_recent(user.id, limit).await?,
        None => log.read_all(user.id).await?,
    };

    if turns.is_empty() {
        if !quiet {
            println!("No conversation yet.");
            println!("\nStart one with: spark chat {}", user.username);
        }
    } else {
        print_turns(&turns);
    }

    Ok(())
}

fn print_turns(turns: &[ChatTurn]) {
    for turn in turns {
        let speaker = match turn.role {
            ChatRole::User => "You",
            ChatRole::Assistant => ASSISTANT_NAME,
        };
        println!(
            "[{}] {}: {}",
            turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
            speaker,
            turn.content
        );
    }
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_doctor(database: Option<&PathBuf>, quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Professor Spark Health Check");
        println!("============================");
        println!();
    }

    let mut all_ok = true;

    // Check configuration
    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            config
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {:#}", e);
            }
            Config::default()
        }
    };

    // Check API key
    match config.llm.redacted_api_key() {
        Ok(Some(redacted)) => {
            if !quiet {
                println!("[OK] API Key: Configured ({})", redacted);
                println!("     Model: {}", config.llm.model);
            }
        }
        Ok(None) => {
            all_ok = false;
            if !quiet {
                warn!("API Key: Not configured");
                println!("[!!] API Key: Not configured");
                println!("     Set GOOGLE_API_KEY (or SPARK_API_KEY) in your environment or .env file");
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] API Key: Error - {}", e);
            }
        }
    }

    // Check config file location
    if !quiet {
        match Config::config_path() {
            Ok(path) => {
                if path.exists() {
                    println!("[OK] Config file: {}", path.display());
                } else {
                    println!("[--] Config file: {} (using defaults)", path.display());
                }
            }
            Err(e) => {
                println!("[!!] Config file: Error - {}", e);
            }
        }
    }

    // Check database
    match open_database(&config, database).await {
        Ok(db) => match db.health_check().await {
            Ok(()) => {
                if !quiet {
                    println!("[OK] Database: Connected");
                    println!("     Path: {}", db.path().display());
                }

                match db.migration_status().await {
                    Ok(status) if status.needs_migration => {
                        all_ok = false;
                        if !quiet {
                            println!(
                                "[!!] Database: Migrations pending (v{} -> v{})",
                                status.current_version, status.target_version
                            );
                        }
                    }
                    Ok(status) => {
                        if !quiet {
                            println!("[OK] Database: Schema v{}", status.current_version);
                        }
                    }
                    Err(e) => {
                        all_ok = false;
                        if !quiet {
                            println!("[!!] Database: Migration check failed - {:#}", e);
                        }
                    }
                }

                if !quiet {
                    let users = CredentialStore::new(&db)
                        .count()
                        .await
                        .context("Failed to count users")?;
                    println!("     Users: {}", users);
                }
            }
            Err(e) => {
                all_ok = false;
                if !quiet {
                    println!("[!!] Database: Health check failed - {:#}", e);
                }
            }
        },
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: Failed to initialize - {:#}", e);
            }
        }
    }

    // Summary
    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed!");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }

    Ok(())
}
