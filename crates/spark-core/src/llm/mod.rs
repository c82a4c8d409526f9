//! LLM integration - Gemini API
//!
//! This module provides:
//! - The `ModelClient` seam the dialogue orchestrator talks to
//! - A Gemini `generateContent` HTTP client
//! - Request/response types matching the Gemini REST API

mod client;
mod traits;
mod types;

pub use client::{GeminiClient, GeminiClientBuilder};
pub use traits::ModelClient;
pub use types::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    LlmResponse, ModelTurn, Part, UsageMetadata,
};
