// End-to-end tests for the WebSocket server
//
// A real bridge is served on an ephemeral port and dialled with a
// tokio-tungstenite client. The upstream is a local echo server, so audio
// goes µ-law -> PCM16 -> (echo) -> µ-law and must come back unchanged.

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;
use voice_bridge::{
    create_router, serve, AppState, BridgeError, BridgeResult, Config, JoinUrlProvider,
    StaticJoinUrl,
};

const WAIT: Duration = Duration::from_secs(5);

/// Upstream stand-in that sends every data frame straight back
async fn spawn_echo_upstream() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Binary(_) | Message::Text(_) => {
                            if ws.send(message).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });
        }
    });

    Ok(format!("ws://{}", addr))
}

/// Upstream stand-in that accepts TCP connections and never answers the
/// WebSocket handshake
async fn spawn_stalled_upstream() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    Ok(format!("ws://{}", addr))
}

struct RejectingProvider;

#[async_trait]
impl JoinUrlProvider for RejectingProvider {
    async fn join_url(&self) -> BridgeResult<String> {
        Err(BridgeError::Bootstrap("call setup rejected".to_string()))
    }

    fn name(&self) -> &str {
        "rejecting"
    }
}

fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.server.bind = "127.0.0.1".to_string();
    cfg.relay.drain_timeout_ms = 200;
    cfg
}

async fn spawn_bridge(
    join_urls: Arc<dyn JoinUrlProvider>,
) -> Result<(SocketAddr, oneshot::Sender<()>)> {
    spawn_bridge_with(test_config(), join_urls).await
}

async fn spawn_bridge_with(
    cfg: Config,
    join_urls: Arc<dyn JoinUrlProvider>,
) -> Result<(SocketAddr, oneshot::Sender<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = AppState::new(cfg, join_urls);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(serve(listener, state, async {
        shutdown_rx.await.ok();
    }));

    Ok((addr, shutdown_tx))
}

async fn active_sessions(addr: SocketAddr) -> Result<u64> {
    let body: serde_json::Value = reqwest::get(format!("http://{}/health", addr))
        .await?
        .json()
        .await?;
    body["active_sessions"]
        .as_u64()
        .ok_or_else(|| anyhow::anyhow!("missing active_sessions"))
}

#[tokio::test]
async fn test_audio_round_trips_through_echo_upstream() -> Result<()> {
    let upstream_url = spawn_echo_upstream().await?;
    let (addr, _shutdown) = spawn_bridge(Arc::new(StaticJoinUrl::new(upstream_url))).await?;

    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr)).await?;

    match timeout(WAIT, client.next()).await? {
        Some(Ok(Message::Text(text))) => {
            let ack: serde_json::Value = serde_json::from_str(&text)?;
            assert_eq!(ack["type"], "connected");
        }
        other => anyhow::bail!("expected acknowledgment, got {:?}", other),
    }

    // 40ms of µ-law silence
    client.send(Message::Binary(vec![0xFF; 320])).await?;
    match timeout(WAIT, client.next()).await? {
        Some(Ok(Message::Binary(data))) => assert_eq!(data, vec![0xFF; 320]),
        other => anyhow::bail!("expected echoed audio, got {:?}", other),
    }

    // Codes survive the round trip exactly (0x7F aside)
    let tone: Vec<u8> = (0x00..0x7F).chain(0x80..=0xFF).collect();
    client.send(Message::Binary(tone.clone())).await?;
    match timeout(WAIT, client.next()).await? {
        Some(Ok(Message::Binary(data))) => assert_eq!(data, tone),
        other => anyhow::bail!("expected echoed audio, got {:?}", other),
    }

    let event = r#"{"event":"media","sequenceNumber":"2"}"#;
    client.send(Message::Text(event.to_string())).await?;
    match timeout(WAIT, client.next()).await? {
        Some(Ok(Message::Text(text))) => assert_eq!(text, event),
        other => anyhow::bail!("expected echoed text, got {:?}", other),
    }

    assert_eq!(active_sessions(addr).await?, 1);

    client.close(None).await?;

    // The session task finishes and releases its slot
    let mut remaining = 50;
    while active_sessions(addr).await? != 0 {
        remaining -= 1;
        assert!(remaining > 0, "Session never finished after client closed");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Ok(())
}

#[tokio::test]
async fn test_bootstrap_failure_closes_client_with_error_code() -> Result<()> {
    let (addr, _shutdown) = spawn_bridge(Arc::new(RejectingProvider)).await?;

    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr)).await?;

    match timeout(WAIT, client.next()).await? {
        Some(Ok(Message::Close(Some(frame)))) => {
            assert_eq!(frame.code, CloseCode::Error);
            assert!(frame.reason.contains("call setup rejected"));
        }
        other => anyhow::bail!("expected close frame, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_unreachable_upstream_closes_client_with_error_code() -> Result<()> {
    // Bind then drop to get a port nothing listens on
    let unused = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;
    let join_url = format!("ws://{}", unused);
    let (addr, _shutdown) = spawn_bridge(Arc::new(StaticJoinUrl::new(join_url))).await?;

    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr)).await?;

    match timeout(WAIT, client.next()).await? {
        Some(Ok(Message::Close(Some(frame)))) => {
            assert_eq!(frame.code, CloseCode::Error);
            assert!(frame.reason.starts_with("upstream connection failed"));
        }
        other => anyhow::bail!("expected close frame, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_stalled_upstream_handshake_closes_client_with_error_code() -> Result<()> {
    let upstream_url = spawn_stalled_upstream().await?;
    let mut cfg = test_config();
    cfg.upstream.connect_timeout_secs = 1;
    let (addr, _shutdown) =
        spawn_bridge_with(cfg, Arc::new(StaticJoinUrl::new(upstream_url))).await?;

    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr)).await?;

    match timeout(WAIT, client.next()).await? {
        Some(Ok(Message::Close(Some(frame)))) => {
            assert_eq!(frame.code, CloseCode::Error);
            assert!(frame.reason.contains("timed out"));
        }
        other => anyhow::bail!("expected close frame, got {:?}", other),
    }

    // The session slot is released
    let mut remaining = 50;
    while active_sessions(addr).await? != 0 {
        remaining -= 1;
        assert!(remaining > 0, "Session never finished after upstream timeout");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Ok(())
}

#[tokio::test]
async fn test_any_path_bridges_a_call() -> Result<()> {
    let upstream_url = spawn_echo_upstream().await?;
    let (addr, _shutdown) = spawn_bridge(Arc::new(StaticJoinUrl::new(upstream_url))).await?;

    let (mut client, _) =
        tokio_tungstenite::connect_async(format!("ws://{}/media-stream/abc", addr)).await?;

    match timeout(WAIT, client.next()).await? {
        Some(Ok(Message::Text(text))) => {
            let ack: serde_json::Value = serde_json::from_str(&text)?;
            assert_eq!(ack["type"], "connected");
        }
        other => anyhow::bail!("expected acknowledgment, got {:?}", other),
    }

    client.send(Message::Binary(vec![0xFF; 160])).await?;
    match timeout(WAIT, client.next()).await? {
        Some(Ok(Message::Binary(data))) => assert_eq!(data, vec![0xFF; 160]),
        other => anyhow::bail!("expected echoed audio, got {:?}", other),
    }

    client.close(None).await?;
    Ok(())
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let state = AppState::new(test_config(), Arc::new(StaticJoinUrl::new("ws://127.0.0.1:9")));
    let app = create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let health: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["active_sessions"], 0);

    Ok(())
}
