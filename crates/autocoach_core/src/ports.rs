//! crates/autocoach_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like model providers
//! or storage backends.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// The variants mirror the failure modes the conversation controller
/// distinguishes; everything provider-specific is flattened into a string.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// No live chat session exists; the caller must initialize one first.
    #[error("Chat session is not initialized")]
    SessionNotInitialized,
    /// The client-side request budget for the trailing minute is exhausted.
    #[error("Request rate limit exceeded")]
    RateLimited,
    /// A network or model failure from the backing provider.
    #[error("Backend error: {0}")]
    Backend(String),
    /// The backend replied, but not in the shape the caller demanded.
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),
    /// The persistent store failed to read or write.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The incremental text fragments of one streamed model reply.
pub type TextFragmentStream = Pin<Box<dyn Stream<Item = Result<String, PortError>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A live conversational context held against the model backend.
///
/// Exactly one session is live at a time; it carries the persona system
/// instruction it was opened with and the turns exchanged so far.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Sends one user message and returns the backend's fragment stream.
    ///
    /// The session folds the completed reply back into its own context, so
    /// the next send carries the full conversation.
    async fn send_message_stream(&self, text: &str) -> PortResult<TextFragmentStream>;
}

#[async_trait]
pub trait ChatModelService: Send + Sync {
    /// Opens a new session bound to `system_instruction`, replacing nothing:
    /// the caller owns session lifetime and discards the prior handle itself.
    fn open_session(&self, system_instruction: &str) -> Box<dyn ChatSession>;

    /// One-shot, non-streaming generation constrained to `json_schema`.
    /// Returns the raw reply text for the caller to parse.
    async fn generate_structured(
        &self,
        prompt: &str,
        system_instruction: &str,
        json_schema: serde_json::Value,
    ) -> PortResult<String>;
}

/// A generic persistent key-value store with JSON-serializable values.
/// Used for the `userProfile` and `chatHistory` keys only. There is no
/// schema migration: a malformed stored value is treated as absent.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value) -> PortResult<()>;
}
