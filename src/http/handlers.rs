use super::state::AppState;
use crate::audio::CallRecorder;
use crate::bridge::{connect_upstream, split_client, split_upstream, BridgeSession};
use crate::error::BridgeError;
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::net::SocketAddr;
use tracing::{debug, error, info};

/// Close reasons must fit in a control frame (125 bytes minus the code)
const MAX_CLOSE_REASON: usize = 123;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
}

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            active_sessions: state.active_sessions(),
        }),
    )
}

/// GET any path but /health
/// Upgrade a client leg and bridge it to a fresh upstream call
pub async fn bridge_socket(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_client(socket, remote, state))
}

async fn handle_client(socket: WebSocket, remote: SocketAddr, state: AppState) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let _active = state.session_guard();

    info!("New client connected from {} (session {})", remote, session_id);

    let join_url = match state.join_urls.join_url().await {
        Ok(url) => url,
        Err(e) => {
            error!("Session {}: {}", session_id, e);
            reject_client(socket, &e).await;
            return;
        }
    };

    let connect_timeout = state.config.upstream.connect_timeout();
    let upstream = match connect_upstream(&join_url, connect_timeout).await {
        Ok(upstream) => upstream,
        Err(e) => {
            error!("Session {}: {}", session_id, e);
            reject_client(socket, &e).await;
            return;
        }
    };

    let (client_sink, client_stream) = split_client(socket);
    let (upstream_sink, upstream_stream) = split_upstream(upstream);

    let mut session = BridgeSession::new(session_id.clone(), client_sink, upstream_sink)
        .with_drain_timeout(state.config.relay.drain_timeout())
        .with_heartbeat(state.config.server.heartbeat());

    if state.config.recording.enabled {
        session = session.with_recorder(CallRecorder::from_config(
            &state.config.recording,
            &session_id,
        ));
    }

    let stats = session.run(client_stream, upstream_stream).await;

    match serde_json::to_string(&stats) {
        Ok(json) => debug!("Session {} stats: {}", session_id, json),
        Err(e) => debug!("Session {} stats not serializable: {}", session_id, e),
    }

    info!("Client {} disconnected", remote);
}

/// Close the client leg with an internal-error code carrying `error`
async fn reject_client(mut socket: WebSocket, error: &BridgeError) {
    let frame = CloseFrame {
        code: close_code::ERROR,
        reason: close_reason(error).into(),
    };

    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!("Failed to send close frame: {}", e);
    }
}

fn close_reason(error: &BridgeError) -> String {
    let mut reason = error.to_string();
    if reason.len() > MAX_CLOSE_REASON {
        let mut end = MAX_CLOSE_REASON;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}
