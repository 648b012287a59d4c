//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::{
    services::{ChatError, Message},
    state::{AppState, ChatOutcome, CompletionPolicy, Session},
};
use super::responses::{ApiResponse, ChatRequestBody, HealthResponse, StatusResponse};

/// Handle POST /session/:session - Select a session and reset the countdown
pub async fn select_session_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let session: Session = match name.parse() {
        Ok(session) => session,
        Err(e) => {
            warn!("Rejected session selection: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let timer = state.select_session(session);
    info!("Session endpoint called - {} selected", session);
    Ok(Json(ApiResponse::idle(
        format!("{} session selected", session),
        timer,
    )))
}

/// Handle POST /start - Start the countdown
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    let (started, timer) = state.start_timer();
    let message = if started {
        info!("Start endpoint called - {} countdown started", timer.session);
        format!("{} countdown started", timer.session)
    } else {
        format!("{} countdown already running", timer.session)
    };
    Json(ApiResponse::running(message, timer))
}

/// Handle POST /stop - Stop and reset the countdown
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    let timer = state.stop_timer();
    info!("Stop endpoint called - {} countdown reset", timer.session);
    Json(ApiResponse::idle(
        format!("{} countdown stopped and reset", timer.session),
        timer,
    ))
}

/// Handle GET /status - Return timer and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let chat_messages = match state.get_history() {
        Ok(history) => history.len(),
        Err(e) => {
            error!("Failed to read chat history: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer: state.timer.snapshot(),
        auto_advance: state.timer.policy() == CompletionPolicy::AutoAdvance,
        notify_assistant: state.notify_assistant,
        completed_sessions: state.get_completed_sessions(),
        chat_messages,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /events - Stream timer events as Server-Sent Events
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = state.timer.subscribe();

    let stream = stream::unfold(events, |mut events| async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let sse = Event::default()
                        .event(event.name())
                        .json_data(&event)
                        .unwrap_or_else(|e| Event::default().comment(format!("unencodable event: {}", e)));
                    return Some((Ok::<_, Infallible>(sse), events));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream client lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handle POST /chat - Forward a user message to the assistant
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatOutcome>, StatusCode> {
    match state.chat(&body.message).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(ChatError::EmptyMessage) => Err(StatusCode::BAD_REQUEST),
        Err(e) => {
            error!("Chat request failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /chat/history - Return the conversation so far
pub async fn history_handler(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Message>>, StatusCode> {
    state.get_history().map(Json).map_err(|e| {
        error!("Failed to read chat history: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
