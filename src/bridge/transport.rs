//! Adapters between the socket libraries and [`LegMessage`] sinks/streams.
//!
//! The client leg is served by axum, the upstream leg is dialled with
//! tokio-tungstenite. Both are reduced to the same shape so the relay never
//! sees either library's message type. Pings are answered by the libraries
//! themselves and filtered out here. Client pongs are kept so the relay can
//! tell the client is still there. A close frame ends the stream.

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message as UpstreamMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::info;

use super::leg::LegMessage;
use crate::error::{BridgeError, BridgeResult};

impl From<LegMessage> for ClientMessage {
    fn from(message: LegMessage) -> Self {
        match message {
            LegMessage::Binary(data) => ClientMessage::Binary(data),
            LegMessage::Text(text) => ClientMessage::Text(text),
            LegMessage::Ping(data) => ClientMessage::Ping(data),
            LegMessage::Pong(data) => ClientMessage::Pong(data),
        }
    }
}

impl From<LegMessage> for UpstreamMessage {
    fn from(message: LegMessage) -> Self {
        match message {
            LegMessage::Binary(data) => UpstreamMessage::Binary(data),
            LegMessage::Text(text) => UpstreamMessage::Text(text),
            LegMessage::Ping(data) => UpstreamMessage::Ping(data),
            LegMessage::Pong(data) => UpstreamMessage::Pong(data),
        }
    }
}

/// Split an accepted client socket into a frame sink and a frame stream
pub fn split_client(
    socket: WebSocket,
) -> (
    impl Sink<LegMessage, Error = axum::Error> + Unpin + Send,
    impl Stream<Item = BridgeResult<LegMessage>> + Send,
) {
    let (sink, stream) = socket.split();

    let sink = sink.with(|message: LegMessage| {
        future::ready(Ok::<_, axum::Error>(ClientMessage::from(message)))
    });

    let stream = stream
        .take_while(|message| future::ready(!matches!(message, Ok(ClientMessage::Close(_)))))
        .filter_map(|message| {
            future::ready(match message {
                Ok(ClientMessage::Binary(data)) => Some(Ok(LegMessage::Binary(data))),
                Ok(ClientMessage::Text(text)) => Some(Ok(LegMessage::Text(text))),
                Ok(ClientMessage::Pong(data)) => Some(Ok(LegMessage::Pong(data))),
                Ok(_) => None,
                Err(e) => Some(Err(BridgeError::transport("client", e))),
            })
        });

    (sink, stream)
}

/// Split a connected upstream socket into a frame sink and a frame stream
pub fn split_upstream<S>(
    socket: WebSocketStream<S>,
) -> (
    impl Sink<LegMessage, Error = tungstenite::Error> + Unpin + Send,
    impl Stream<Item = BridgeResult<LegMessage>> + Send,
)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (sink, stream) = socket.split();

    let sink = sink.with(|message: LegMessage| {
        future::ready(Ok::<_, tungstenite::Error>(UpstreamMessage::from(message)))
    });

    let stream = stream
        .take_while(|message| future::ready(!matches!(message, Ok(UpstreamMessage::Close(_)))))
        .filter_map(|message| {
            future::ready(match message {
                Ok(UpstreamMessage::Binary(data)) => Some(Ok(LegMessage::Binary(data))),
                Ok(UpstreamMessage::Text(text)) => Some(Ok(LegMessage::Text(text))),
                Ok(_) => None,
                Err(e) => Some(Err(BridgeError::transport("upstream", e))),
            })
        });

    (sink, stream)
}

/// Open the upstream WebSocket at `join_url` (ws:// or wss://), giving up
/// after `connect_timeout`
pub async fn connect_upstream(
    join_url: &str,
    connect_timeout: Duration,
) -> BridgeResult<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    info!("Connecting to upstream at {}", join_url);

    let (socket, response) =
        tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(join_url))
            .await
            .map_err(|_| BridgeError::UpstreamTimeout(connect_timeout))??;

    info!("Connected to upstream (HTTP {})", response.status());

    Ok(socket)
}
