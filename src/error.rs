use thiserror::Error;

/// Failures a bridge session can run into.
///
/// Only [`BridgeError::Bootstrap`] and the upstream connect failures are
/// surfaced to the client (as the close reason); everything else ends a
/// single relay direction or is logged during teardown.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A leg closed or errored while reading or sending.
    #[error("{leg} leg closed: {reason}")]
    TransportClosed { leg: &'static str, reason: String },

    /// The call-setup request failed or returned no join URL.
    #[error("session bootstrap failed: {0}")]
    Bootstrap(String),

    /// The upstream WebSocket handshake failed.
    #[error("upstream connection failed: {0}")]
    UpstreamConnect(#[from] tokio_tungstenite::tungstenite::Error),

    /// The upstream WebSocket handshake did not finish in time.
    #[error("upstream connection timed out after {0:?}")]
    UpstreamTimeout(std::time::Duration),

    /// Writing the call recording failed.
    #[error("recording failed: {0}")]
    Recording(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn transport(leg: &'static str, reason: impl ToString) -> Self {
        BridgeError::TransportClosed {
            leg,
            reason: reason.to_string(),
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
