use futures::{Sink, SinkExt};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};

/// One frame moving over a leg, independent of the socket library carrying it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegMessage {
    /// Audio: µ-law on the client leg, PCM16 LE on the upstream leg
    Binary(Vec<u8>),
    /// Opaque control message, passed through untouched
    Text(String),
    /// Keepalive probe; never relayed to the other leg
    Ping(Vec<u8>),
    /// Keepalive answer; never relayed to the other leg
    Pong(Vec<u8>),
}

/// Sending half of one side of a bridged call
///
/// Sends are skipped once the leg is known to be closed. A failed send marks
/// the leg closed so the other direction stops writing to it too.
pub struct Leg<S> {
    name: &'static str,
    sink: Mutex<S>,
    open: AtomicBool,
    close_attempted: AtomicBool,
}

impl<S> Leg<S>
where
    S: Sink<LegMessage> + Unpin + Send,
    S::Error: Display,
{
    pub fn new(name: &'static str, sink: S) -> Self {
        Self {
            name,
            sink: Mutex::new(sink),
            open: AtomicBool::new(true),
            close_attempted: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Record that the transport under this leg has gone away
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Send a frame if the leg is open
    ///
    /// Returns `Ok(false)` when the frame was skipped because the leg had
    /// already closed.
    pub async fn send(&self, message: LegMessage) -> BridgeResult<bool> {
        if !self.is_open() {
            return Ok(false);
        }

        let mut sink = self.sink.lock().await;
        match sink.send(message).await {
            Ok(()) => Ok(true),
            Err(e) => {
                self.mark_closed();
                Err(BridgeError::transport(self.name, e))
            }
        }
    }

    /// Close the underlying sink. Safe to call any number of times.
    ///
    /// Returns `true` only for the call that actually closed the sink.
    pub async fn close(&self) -> bool {
        self.mark_closed();
        if self.close_attempted.swap(true, Ordering::SeqCst) {
            return false;
        }

        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            debug!("Closing {} leg: {}", self.name, e);
        }
        true
    }
}
