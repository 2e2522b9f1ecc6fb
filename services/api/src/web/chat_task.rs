//! services/api/src/web/chat_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! handling a single chat turn: rate-checked send, incremental stream
//! assembly, XP accounting, and failure cleanup.

use crate::web::{
    protocol::ServerMessage,
    state::{AppState, SessionState},
    ws_handler::send_to_client,
};
use autocoach_core::domain::{ChatMessage, MessageAuthor};
use autocoach_core::extract::extract_segments;
use autocoach_core::ports::PortError;
use autocoach_core::progress;
use axum::extract::ws::{Message, WebSocket};
use futures::{stream::SplitSink, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Shown when the rolling request budget is exhausted.
const RATE_LIMIT_MESSAGE: &str =
    "You've reached the request limit for the free tier. Please wait a moment before sending another message.";

/// Shown for any other send or stream failure.
const GENERIC_ERROR_MESSAGE: &str =
    "I'm sorry, I encountered an error. Please check your API key or try again later.";

/// The main asynchronous task for handling a single user chat turn.
///
/// On success the transcript gains the user message and the completed bot
/// reply. On failure the user message is retracted and the bot entry
/// carries a user-facing error string, so the visible history only ever
/// contains turns that received an answer.
pub async fn chat_turn(
    app_state: Arc<AppState>,
    session_state_lock: Arc<Mutex<SessionState>>,
    ws_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    content: String,
    cancellation_token: CancellationToken,
) {
    let start_time = Instant::now();
    info!("Chat turn started.");

    // --- 1. Append the user message and the bot placeholder ---
    let bot_index = {
        let mut session = session_state_lock.lock().await;
        let user_message = ChatMessage::user(content.clone());
        session.transcript.push(user_message.clone());
        session.transcript.push(ChatMessage::bot(""));

        send_to_client(&ws_sender, &ServerMessage::UserMessage { message: user_message }).await;
        send_to_client(&ws_sender, &ServerMessage::BotMessageStarted).await;
        session.transcript.len() - 1
    };

    // --- 2. Open the stream (rate check happens inside the manager) ---
    let stream_result = {
        let mut session = session_state_lock.lock().await;
        session.manager.send_message_stream(&content).await
    };

    let mut fragment_stream = match stream_result {
        Ok(stream) => stream,
        Err(e) => {
            fail_turn(&session_state_lock, &ws_sender, &app_state, bot_index, &e).await;
            return;
        }
    };

    // --- 3. Award XP for the accepted send ---
    // The award keys off the stream starting, not completing: a mid-stream
    // failure later still keeps this XP (longstanding behavior).
    {
        let mut session = session_state_lock.lock().await;
        let amount = progress::message_xp(session.profile.streak);
        let (updated, notices) = progress::award_xp(&session.profile, amount);
        session.profile = updated;

        if let Err(e) = session.persist_profile(app_state.store.as_ref()).await {
            error!("Failed to persist profile after XP award: {e}");
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

    // --- 4. Assemble the streamed reply ---
    let mut buffer = String::new();
    loop {
        if cancellation_token.is_cancelled() {
            info!("Chat turn cancelled mid-stream.");
            return;
        }

        match fragment_stream.next().await {
            Some(Ok(fragment)) => {
                buffer.push_str(&fragment);
                let mut session = session_state_lock.lock().await;
                if let Some(entry) = session.transcript.get_mut(bot_index) {
                    entry.content = buffer.clone();
                }
                send_to_client(
                    &ws_sender,
                    &ServerMessage::BotMessageDelta { content: buffer.clone() },
                )
                .await;
            }
            Some(Err(e)) => {
                fail_turn(&session_state_lock, &ws_sender, &app_state, bot_index, &e).await;
                return;
            }
            None => break,
        }
    }

    // --- 5. Finalize: extract segments and persist ---
    let segments = extract_segments(&buffer);
    {
        let mut session = session_state_lock.lock().await;
        if let Some(entry) = session.transcript.get_mut(bot_index) {
            entry.content = buffer.clone();
        }
        if let Err(e) = session.persist_transcript(app_state.store.as_ref()).await {
            error!("Failed to persist transcript: {e}");
        }
    }
    send_to_client(
        &ws_sender,
        &ServerMessage::BotMessageCompleted { content: buffer, segments },
    )
    .await;

    info!("⏱️ Chat turn took: {:?}", start_time.elapsed());
}

/// Replaces the in-progress bot entry with a user-facing error string and
/// retracts the triggering user message, keeping the displayed history
/// consistent with "turns that received a response".
async fn fail_turn(
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    app_state: &Arc<AppState>,
    bot_index: usize,
    error: &PortError,
) {
    warn!("Chat turn failed: {error}");
    let error_text = match error {
        PortError::RateLimited => RATE_LIMIT_MESSAGE,
        _ => GENERIC_ERROR_MESSAGE,
    };

    let mut session = session_state_lock.lock().await;
    if let Some(entry) = session.transcript.get_mut(bot_index) {
        entry.content = error_text.to_string();
    }

    // Retract the user message that failed.
    let user_index = bot_index.wrapping_sub(1);
    if session
        .transcript
        .get(user_index)
        .is_some_and(|m| m.author == MessageAuthor::User)
    {
        session.transcript.remove(user_index);
        send_to_client(ws_sender, &ServerMessage::UserMessageRetracted).await;
    }

    if let Err(e) = session.persist_transcript(app_state.store.as_ref()).await {
        error!("Failed to persist transcript after failed turn: {e}");
    }

    send_to_client(
        ws_sender,
        &ServerMessage::BotMessageCompleted {
            content: error_text.to_string(),
            segments: extract_segments(error_text),
        },
    )
    .await;
}
