//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the tutoring chat application.

use autocoach_core::domain::{ChatMessage, LearningLevel, QuizQuestion, UserProfile};
use autocoach_core::extract::MessageSegment;
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts the session. This must be the first message sent on the
    /// connection; the server replies with `SessionInitialized` or `Error`.
    Init,

    /// One user chat turn.
    SendMessage { content: String },

    /// Asks for a quiz derived from the recent conversation.
    GenerateQuiz,

    /// Reports a finished quiz: how many of `total` questions were correct.
    QuizComplete { score: usize, total: usize },

    /// Updates the tutor persona settings mid-session.
    UpdateProfile {
        learning_level: LearningLevel,
        subject_preferences: Option<String>,
    },

    /// Clears the transcript and starts a fresh conversation.
    NewChat,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms successful session start, with the state to render.
    SessionInitialized {
        profile: UserProfile,
        history: Vec<ChatMessage>,
    },

    /// Echoes an accepted user message appended to the transcript.
    UserMessage { message: ChatMessage },

    /// A bot reply has started streaming; an empty bot entry now ends the
    /// transcript.
    BotMessageStarted,

    /// The full accumulated content of the in-progress bot reply. Clients
    /// replace the last bot entry's content with this buffer (the "typing"
    /// effect).
    BotMessageDelta { content: String },

    /// The bot reply is final. `segments` is the extractor's partition of
    /// `content` into prose and resource cards.
    BotMessageCompleted {
        content: String,
        segments: Vec<MessageSegment>,
    },

    /// The user message that triggered a failed turn has been removed, so
    /// the visible history stays answer-complete.
    UserMessageRetracted,

    /// A bot transcript entry produced by the server itself (greetings,
    /// level-up notices, quiz status lines).
    BotNotice { message: ChatMessage },

    /// The profile changed (XP, level, streak, or preferences).
    ProfileUpdated { profile: UserProfile },

    /// A generated quiz, ready to present.
    QuizReady { questions: Vec<QuizQuestion> },

    /// A turn or quiz request was rejected because one is already running.
    Busy,

    /// Reports a fatal error to the client, which should display an error message.
    Error { message: String },
}
