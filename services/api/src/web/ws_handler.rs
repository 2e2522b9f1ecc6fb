//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It manages the session's lifecycle and delegates chat and quiz work.

use crate::web::{
    chat_task::chat_turn,
    protocol::{ClientMessage, ServerMessage},
    quiz_task::{complete_quiz, generate_quiz},
    state::{AppState, SessionState},
};
use autocoach_core::domain::ChatMessage;
use autocoach_core::persona;
use autocoach_core::progress::compute_streak;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use chrono::Utc;
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Serializes and sends one server message; returns false when the client
/// is gone.
pub(crate) async fn send_to_client(
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    message: &ServerMessage,
) -> bool {
    let json = serde_json::to_string(message).unwrap();
    ws_sender.lock().await.send(Message::Text(json.into())).await.is_ok()
}

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable access across tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender = Arc::new(Mutex::new(sender));

    let session_state_lock: Arc<Mutex<SessionState>>;

    // --- 1. Initialization Phase ---
    if let Some(Ok(Message::Text(init_json))) = receiver.next().await {
        match serde_json::from_str::<ClientMessage>(&init_json) {
            Ok(ClientMessage::Init) => {
                match SessionState::new(app_state.clone()).await {
                    Ok(mut state) => {
                        // The login-day streak check runs exactly once, here.
                        state.profile = compute_streak(&state.profile, Utc::now().date_naive());
                        if let Err(e) = state.persist_profile(app_state.store.as_ref()).await {
                            error!("Failed to persist profile at session start: {e}");
                        }

                        state.manager.initialize(&state.profile);

                        if state.transcript.is_empty() {
                            state
                                .transcript
                                .push(ChatMessage::bot(persona::welcome_back_greeting(&state.profile)));
                            if let Err(e) = state.persist_transcript(app_state.store.as_ref()).await {
                                error!("Failed to persist greeting: {e}");
                            }
                        }

                        let init_msg = ServerMessage::SessionInitialized {
                            profile: state.profile.clone(),
                            history: state.transcript.clone(),
                        };
                        session_state_lock = Arc::new(Mutex::new(state));
                        if !send_to_client(&ws_sender, &init_msg).await {
                            error!("Failed to send session initialized message.");
                            return;
                        }
                    }
                    Err(e) => {
                        error!("Failed to initialize session state: {:?}", e);
                        let err_msg = ServerMessage::Error {
                            message: "Failed to load profile data. Please sign up first.".to_string(),
                        };
                        let _ = send_to_client(&ws_sender, &err_msg).await;
                        return;
                    }
                }
            }
            _ => {
                error!("First message was not a valid Init message.");
                return;
            }
        }
    } else {
        error!("Client disconnected before sending Init message.");
        return;
    }

    // --- 2. Main Message Loop ---
    let mut turn_task_handle: Option<JoinHandle<()>> = None;

    loop {
        if let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_message(
                        text.to_string(),
                        &app_state,
                        &session_state_lock,
                        &ws_sender,
                        &mut turn_task_handle,
                    )
                    .await;
                }
                Message::Close(_) => {
                    info!("Client sent close message.");
                    break;
                }
                _ => {}
            }
        } else {
            info!("Client disconnected.");
            break;
        }
    }

    // --- 3. Cleanup ---
    {
        let session = session_state_lock.lock().await;
        session.cancellation_token.cancel();
    }
    if let Some(handle) = turn_task_handle {
        handle.abort();
    }
    info!("WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: String,
    app_state: &Arc<AppState>,
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    turn_task_handle: &mut Option<JoinHandle<()>>,
) {
    match serde_json::from_str::<ClientMessage>(&text) {
        Ok(client_msg) => match client_msg {
            ClientMessage::SendMessage { content } => {
                if content.trim().is_empty() {
                    return;
                }
                let Some(token) = begin_turn(session_state_lock, ws_sender).await else {
                    return;
                };

                let task = {
                    let app_state = app_state.clone();
                    let session_state_lock = session_state_lock.clone();
                    let ws_sender = ws_sender.clone();
                    tokio::spawn(async move {
                        chat_turn(
                            app_state,
                            session_state_lock.clone(),
                            ws_sender,
                            content,
                            token,
                        )
                        .await;
                        session_state_lock.lock().await.busy = false;
                    })
                };
                *turn_task_handle = Some(task);
            }
            ClientMessage::GenerateQuiz => {
                let Some(_token) = begin_turn(session_state_lock, ws_sender).await else {
                    return;
                };

                let task = {
                    let app_state = app_state.clone();
                    let session_state_lock = session_state_lock.clone();
                    let ws_sender = ws_sender.clone();
                    tokio::spawn(async move {
                        generate_quiz(app_state, session_state_lock.clone(), ws_sender).await;
                        session_state_lock.lock().await.busy = false;
                    })
                };
                *turn_task_handle = Some(task);
            }
            ClientMessage::QuizComplete { score, total } => {
                if score > total {
                    warn!("Ignoring quiz result with score {} > total {}.", score, total);
                    return;
                }
                complete_quiz(
                    app_state.clone(),
                    session_state_lock.clone(),
                    ws_sender.clone(),
                    score,
                    total,
                )
                .await;
            }
            ClientMessage::UpdateProfile {
                learning_level,
                subject_preferences,
            } => {
                info!("UpdateProfile message received.");
                let mut session = session_state_lock.lock().await;
                if session.busy {
                    send_to_client(ws_sender, &ServerMessage::Busy).await;
                    return;
                }

                session.profile.learning_level = learning_level;
                session.profile.subject_preferences =
                    subject_preferences.filter(|p| !p.trim().is_empty());
                if let Err(e) = session.persist_profile(app_state.store.as_ref()).await {
                    error!("Failed to persist updated profile: {e}");
                }

                // The persona changed, so the session is rebuilt around it.
                let profile = session.profile.clone();
                session.manager.initialize(&profile);

                let notice = ChatMessage::bot(persona::PREFERENCES_UPDATED_MESSAGE);
                session.transcript.push(notice.clone());
                if let Err(e) = session.persist_transcript(app_state.store.as_ref()).await {
                    error!("Failed to persist transcript: {e}");
                }

                send_to_client(ws_sender, &ServerMessage::ProfileUpdated { profile }).await;
                send_to_client(ws_sender, &ServerMessage::BotNotice { message: notice }).await;
            }
            ClientMessage::NewChat => {
                info!("NewChat message received.");
                let mut session = session_state_lock.lock().await;
                if session.busy {
                    send_to_client(ws_sender, &ServerMessage::Busy).await;
                    return;
                }

                session.transcript =
                    vec![ChatMessage::bot(persona::new_chat_greeting(&session.profile))];
                if let Err(e) = session.persist_transcript(app_state.store.as_ref()).await {
                    error!("Failed to persist transcript: {e}");
                }

                let profile = session.profile.clone();
                session.manager.initialize(&profile);

                send_to_client(
                    ws_sender,
                    &ServerMessage::SessionInitialized {
                        profile,
                        history: session.transcript.clone(),
                    },
                )
                .await;
            }
            ClientMessage::Init => {
                warn!("Received subsequent Init message, which is ignored.");
            }
        },
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
        }
    }
}

/// Marks the connection busy for a model-bound request. Returns a fresh
/// cancellation token, or `None` (after notifying the client) when a prior
/// request is still outstanding. At most one in-flight model call exists
/// per connection.
async fn begin_turn(
    session_state_lock: &Arc<Mutex<SessionState>>,
    ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
) -> Option<CancellationToken> {
    let mut session = session_state_lock.lock().await;
    if session.busy {
        send_to_client(ws_sender, &ServerMessage::Busy).await;
        return None;
    }
    session.busy = true;
    session.cancellation_token = CancellationToken::new();
    Some(session.cancellation_token.clone())
}
