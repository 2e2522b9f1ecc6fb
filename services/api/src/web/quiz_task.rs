//! services/api/src/web/quiz_task.rs
//!
//! This module contains the asynchronous "worker" functions for the quiz
//! flow: deriving a quiz from recent conversation context and applying the
//! XP reward when the user finishes one.

use crate::web::{
    protocol::ServerMessage,
    state::{AppState, SessionState},
    ws_handler::send_to_client,
};
use autocoach_core::domain::ChatMessage;
use autocoach_core::persona;
use autocoach_core::progress;
use autocoach_core::quiz::{parse_quiz_reply, quiz_response_schema, recent_topics};
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const QUIZ_STARTING_MESSAGE: &str =
    "Generating a quiz based on our recent conversation... this might take a moment!";

/// Shown for the valid zero-result: not enough conversation to quiz on.
const QUIZ_EMPTY_MESSAGE: &str =
    "I couldn't generate a quiz right now. Let's chat a bit more about a topic first!";

/// Shown when the backend call or reply parsing fails.
const QUIZ_FAILURE_MESSAGE: &str =
    "Sorry, I ran into an error while creating the quiz. Please try again.";

/// Derives a quiz from the last few bot replies and presents it.
///
/// "Not enough context" is a non-error outcome and produces a friendly
/// nudge; a backend or parse failure produces the apology message. Both
/// leave the connection ready for the next request.
pub async fn generate_quiz(
    app_state: Arc<AppState>,
    session_state_lock: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
) {
    info!("Quiz generation started.");
    append_notice(&app_state, &session_state_lock, &ws_sender, QUIZ_STARTING_MESSAGE).await;

    let topics = {
        let session = session_state_lock.lock().await;
        recent_topics(&session.transcript)
    };

    let Some(topics) = topics else {
        info!("Not enough context to generate a quiz.");
        append_notice(&app_state, &session_state_lock, &ws_sender, QUIZ_EMPTY_MESSAGE).await;
        return;
    };

    let Some(backend) = &app_state.chat_backend else {
        warn!("Quiz requested without a configured chat backend.");
        append_notice(&app_state, &session_state_lock, &ws_sender, QUIZ_FAILURE_MESSAGE).await;
        return;
    };

    let reply = backend
        .generate_structured(
            persona::QUIZ_PROMPT,
            &persona::quiz_instruction(&topics),
            quiz_response_schema(),
        )
        .await;

    let questions = match reply.and_then(|raw| parse_quiz_reply(&raw)) {
        Ok(questions) => questions,
        Err(e) => {
            error!("Error generating quiz: {e}");
            append_notice(&app_state, &session_state_lock, &ws_sender, QUIZ_FAILURE_MESSAGE).await;
            return;
        }
    };

    if questions.is_empty() {
        append_notice(&app_state, &session_state_lock, &ws_sender, QUIZ_EMPTY_MESSAGE).await;
        return;
    }

    info!("Generated a {}-question quiz.", questions.len());
    send_to_client(&ws_sender, &ServerMessage::QuizReady { questions }).await;
}

/// Applies the reward for a finished quiz: proportional XP (with any
/// level-up cascade) plus a score summary in the transcript.
pub async fn complete_quiz(
    app_state: Arc<AppState>,
    session_state_lock: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    score: usize,
    total: usize,
) {
    let xp_gained = progress::quiz_xp(score, total);

    {
        let mut session = session_state_lock.lock().await;
        let (updated, notices) = progress::award_xp(&session.profile, xp_gained);
        session.profile = updated;

        if let Err(e) = session.persist_profile(app_state.store.as_ref()).await {
            error!("Failed to persist profile after quiz: {e}");
        }
        send_to_client(
            &ws_sender,
            &ServerMessage::ProfileUpdated { profile: session.profile.clone() },
        )
        .await;

        if !notices.is_empty() {
            let notice = ChatMessage::bot(notices.join("\n"));
            session.transcript.push(notice.clone());
            send_to_client(&ws_sender, &ServerMessage::BotNotice { message: notice }).await;
        }
    }

    let summary = format!(
        "Quiz complete! You scored {score}/{total}. You've earned {xp_gained} XP for your effort!"
    );
    append_notice(&app_state, &session_state_lock, &ws_sender, &summary).await;
}

/// Appends a server-authored bot entry to the transcript, persists it, and
/// mirrors it to the client.
async fn append_notice(
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    text: &str,
) {
    let mut session = session_state_lock.lock().await;
    let message = ChatMessage::bot(text);
    session.transcript.push(message.clone());
    if let Err(e) = session.persist_transcript(app_state.store.as_ref()).await {
        error!("Failed to persist transcript: {e}");
    }
    send_to_client(ws_sender, &ServerMessage::BotNotice { message }).await;
}
