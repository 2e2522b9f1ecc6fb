//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use crate::session::SessionManager;
use autocoach_core::domain::{ChatMessage, UserProfile};
use autocoach_core::ports::{ChatModelService, PortError, PortResult, ProfileStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Store key for the persisted profile.
pub const PROFILE_KEY: &str = "userProfile";
/// Store key for the persisted transcript.
pub const HISTORY_KEY: &str = "chatHistory";

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn ProfileStore>,
    /// `None` when no API credential was configured; connections still work
    /// but every send reports an uninitialized session.
    pub chat_backend: Option<Arc<dyn ChatModelService>>,
}

//=========================================================================================
// SessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active WebSocket connection.
pub struct SessionState {
    pub profile: UserProfile,
    pub transcript: Vec<ChatMessage>,
    pub manager: SessionManager,
    /// True while a model turn or quiz generation is outstanding; at most
    /// one in-flight request per connection.
    pub busy: bool,
    /// A token to gracefully cancel an in-progress streaming turn.
    pub cancellation_token: CancellationToken,
}

impl SessionState {
    /// Creates a new `SessionState` by loading the persisted profile and
    /// transcript from the store. A missing profile is an error (the client
    /// must sign up over REST first); a missing or malformed transcript
    /// falls back to empty.
    pub async fn new(app_state: Arc<AppState>) -> PortResult<Self> {
        let profile_value = app_state
            .store
            .get(PROFILE_KEY)
            .await?
            .ok_or_else(|| PortError::Storage("No stored profile; sign up first.".to_string()))?;
        let profile: UserProfile = serde_json::from_value(profile_value)
            .map_err(|e| PortError::Storage(format!("Stored profile is malformed: {e}")))?;

        let transcript = match app_state.store.get(HISTORY_KEY).await? {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Stored chat history is malformed, starting empty: {e}");
                Vec::new()
            }),
            None => Vec::new(),
        };

        Ok(Self {
            profile,
            transcript,
            manager: SessionManager::new(app_state.chat_backend.clone()),
            busy: false,
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Writes the profile back to the store.
    pub async fn persist_profile(&self, store: &dyn ProfileStore) -> PortResult<()> {
        let value = serde_json::to_value(&self.profile)
            .map_err(|e| PortError::Storage(e.to_string()))?;
        store.set(PROFILE_KEY, value).await
    }

    /// Writes the transcript back to the store.
    pub async fn persist_transcript(&self, store: &dyn ProfileStore) -> PortResult<()> {
        let value = serde_json::to_value(&self.transcript)
            .map_err(|e| PortError::Storage(e.to_string()))?;
        store.set(HISTORY_KEY, value).await
    }
}
