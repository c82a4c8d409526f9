//! Error types for Professor Spark

use thiserror::Error;

/// Result type alias using Professor Spark's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Professor Spark error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check your API key with `spark config get llm.api_key`.")]
    LLMError(String),

    #[error("Rate limited. Retry after {0} seconds.")]
    RateLimited(u64),

    #[error("LLM request timed out after {0} seconds")]
    Timeout(u64),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Storage initialization failed: {0}")]
    StorageInit(String),

    // Credential errors (E500-E599)
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::Timeout(_) => "E103",
            Self::DatabaseError(_) => "E400",
            Self::StorageInit(_) => "E401",
            Self::PasswordHash(_) => "E500",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("spark config get llm.api_key".to_string()),
            Self::Timeout(_) => Some("spark config set llm.timeout_secs <seconds>".to_string()),
            Self::ConfigError(_) => Some("Set GOOGLE_API_KEY in your environment or .env file".to_string()),
            Self::StorageInit(_) => Some("spark doctor".to_string()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::StorageInit(format!("{:#}", err))
    }
}
