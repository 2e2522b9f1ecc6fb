//! services/api/src/session.rs
//!
//! The conversation-session manager: owns the single live chat session and
//! the request-rate budget for one connection.
//!
//! Constructed explicitly and injected by the connection handler (no global
//! state), so each connection and each test gets a fresh instance with a
//! deterministic lifecycle.

use autocoach_core::domain::UserProfile;
use autocoach_core::persona;
use autocoach_core::ports::{ChatModelService, ChatSession, PortError, PortResult, TextFragmentStream};
use autocoach_core::rate_limit::RateLimiter;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SessionManager {
    /// `None` when the backend client could not be constructed (for example
    /// a missing credential); distinct from a session that errors at send.
    backend: Option<Arc<dyn ChatModelService>>,
    session: Option<Box<dyn ChatSession>>,
    limiter: RateLimiter,
}

impl SessionManager {
    pub fn new(backend: Option<Arc<dyn ChatModelService>>) -> Self {
        Self {
            backend,
            session: None,
            limiter: RateLimiter::new(),
        }
    }

    /// Opens a fresh session bound to the persona instruction for `profile`,
    /// discarding any prior session. Called at connection start and again
    /// whenever the profile's name, level, or preferences change, or the
    /// user starts a new conversation.
    ///
    /// Fails silently when no backend client exists; callers observe that
    /// through `is_initialized`.
    pub fn initialize(&mut self, profile: &UserProfile) {
        let Some(backend) = &self.backend else {
            warn!("Chat backend not available. Check API key.");
            self.session = None;
            return;
        };

        let instruction = persona::system_instruction(
            &profile.name,
            profile.learning_level,
            profile.subject_preferences.as_deref(),
        );
        self.session = Some(backend.open_session(&instruction));
        info!("Chat session initialized for {}.", profile.name);
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Sends one user message and returns the backend's fragment stream
    /// unmodified.
    ///
    /// The rate check happens before any network call and a rejected
    /// request commits no timestamp; only an admitted send consumes budget.
    pub async fn send_message_stream(&mut self, text: &str) -> PortResult<TextFragmentStream> {
        let Some(session) = &self.session else {
            return Err(PortError::SessionNotInitialized);
        };

        if self.limiter.is_over_limit() {
            return Err(PortError::RateLimited);
        }
        self.limiter.record();

        session.send_message_stream(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use autocoach_core::domain::LearningLevel;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    struct RecordingBackend {
        instructions: Mutex<Vec<String>>,
    }

    struct SilentSession;

    #[async_trait]
    impl ChatSession for SilentSession {
        async fn send_message_stream(&self, _text: &str) -> PortResult<TextFragmentStream> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    #[async_trait]
    impl ChatModelService for RecordingBackend {
        fn open_session(&self, system_instruction: &str) -> Box<dyn ChatSession> {
            self.instructions
                .lock()
                .unwrap()
                .push(system_instruction.to_string());
            Box::new(SilentSession)
        }

        async fn generate_structured(
            &self,
            _prompt: &str,
            _system_instruction: &str,
            _json_schema: serde_json::Value,
        ) -> PortResult<String> {
            unreachable!("not used in these tests")
        }
    }

    fn profile() -> UserProfile {
        UserProfile::new(
            "Alex".to_string(),
            LearningLevel::University,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn send_without_initialize_fails() {
        let backend = Arc::new(RecordingBackend {
            instructions: Mutex::new(Vec::new()),
        });
        let mut manager = SessionManager::new(Some(backend));
        assert!(!manager.is_initialized());

        let err = match manager.send_message_stream("hi").await {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(matches!(err, PortError::SessionNotInitialized));
    }

    #[tokio::test]
    async fn missing_backend_leaves_session_uninitialized() {
        let mut manager = SessionManager::new(None);
        manager.initialize(&profile());
        assert!(!manager.is_initialized());
    }

    #[tokio::test]
    async fn reinitialize_opens_a_new_session_with_new_instruction() {
        let backend = Arc::new(RecordingBackend {
            instructions: Mutex::new(Vec::new()),
        });
        let mut manager = SessionManager::new(Some(backend.clone()));

        let mut p = profile();
        manager.initialize(&p);
        p.subject_preferences = Some("rocketry".to_string());
        manager.initialize(&p);

        let seen = backend.instructions.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].contains("rocketry"));
        assert!(seen[1].contains("rocketry"));
    }

    #[tokio::test]
    async fn sixth_send_in_window_is_rate_limited() {
        let backend = Arc::new(RecordingBackend {
            instructions: Mutex::new(Vec::new()),
        });
        let mut manager = SessionManager::new(Some(backend));
        manager.initialize(&profile());

        for _ in 0..5 {
            manager.send_message_stream("hello").await.unwrap();
        }
        let err = match manager.send_message_stream("hello").await {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert!(matches!(err, PortError::RateLimited));
    }
}
