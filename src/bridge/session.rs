use chrono::{DateTime, Utc};
use futures::{Sink, Stream};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::leg::{Leg, LegMessage};
use super::messages::ControlMessage;
use super::relay;
use super::stats::{DirectionCounters, DirectionEnd, SessionStats};
use crate::audio::CallRecorder;
use crate::config::Heartbeat;
use crate::error::BridgeResult;

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// One bridged call: a client leg, an upstream leg and what flows between them
///
/// Each session owns its legs, their open flags and its recorder; nothing is
/// shared with other sessions.
pub struct BridgeSession<C, U> {
    id: String,
    started_at: DateTime<Utc>,
    client: Leg<C>,
    upstream: Leg<U>,
    recorder: Option<CallRecorder>,
    drain_timeout: Duration,
    heartbeat: Option<Heartbeat>,
    client_counters: DirectionCounters,
    upstream_counters: DirectionCounters,
    torn_down: bool,
    recorded_secs: Option<f64>,
}

impl<C, U> BridgeSession<C, U>
where
    C: Sink<LegMessage> + Unpin + Send,
    C::Error: Display,
    U: Sink<LegMessage> + Unpin + Send,
    U::Error: Display,
{
    pub fn new(id: impl Into<String>, client_sink: C, upstream_sink: U) -> Self {
        Self {
            id: id.into(),
            started_at: Utc::now(),
            client: Leg::new("client", client_sink),
            upstream: Leg::new("upstream", upstream_sink),
            recorder: None,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            heartbeat: None,
            client_counters: DirectionCounters::default(),
            upstream_counters: DirectionCounters::default(),
            torn_down: false,
            recorded_secs: None,
        }
    }

    /// Record upstream audio for the lifetime of the session
    pub fn with_recorder(mut self, recorder: CallRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Ping the client and drop it once it goes silent
    pub fn with_heartbeat(mut self, heartbeat: Option<Heartbeat>) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client(&self) -> &Leg<C> {
        &self.client
    }

    pub fn upstream(&self) -> &Leg<U> {
        &self.upstream
    }

    /// Acknowledge the client, relay both directions until they end, then
    /// tear down
    pub async fn run<CS, US>(&mut self, client_source: CS, upstream_source: US) -> SessionStats
    where
        CS: Stream<Item = BridgeResult<LegMessage>>,
        US: Stream<Item = BridgeResult<LegMessage>>,
    {
        info!("Bridge session {} started", self.id);

        match serde_json::to_string(&ControlMessage::connected()) {
            Ok(ack) => {
                if let Err(e) = self.client.send(LegMessage::Text(ack)).await {
                    warn!("Failed to acknowledge client: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize acknowledgment: {}", e),
        }

        let drain_timeout = self.drain_timeout;
        let (outbound_end, inbound_end) = {
            let outbound = relay::client_to_upstream(
                client_source,
                &self.client,
                &self.upstream,
                self.heartbeat,
                &self.client_counters,
            );
            let inbound = relay::upstream_to_client(
                upstream_source,
                &self.upstream,
                &self.client,
                self.recorder.as_mut(),
                &self.upstream_counters,
            );
            tokio::pin!(outbound);
            tokio::pin!(inbound);

            tokio::select! {
                end = &mut outbound => {
                    debug!("client->upstream ended: {:?}", end);
                    let other = drain(&mut inbound, drain_timeout, "upstream->client").await;
                    (end, other)
                }
                end = &mut inbound => {
                    debug!("upstream->client ended: {:?}", end);
                    let other = drain(&mut outbound, drain_timeout, "client->upstream").await;
                    (other, end)
                }
            }
        };

        self.teardown().await;

        let duration = Utc::now().signed_duration_since(self.started_at);
        let stats = SessionStats {
            session_id: self.id.clone(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            client_to_upstream: self.client_counters.snapshot(outbound_end),
            upstream_to_client: self.upstream_counters.snapshot(inbound_end),
            recorded_secs: self.recorded_secs,
        };

        info!(
            "Bridge session {} ended after {:.1}s ({} frames up, {} frames down)",
            stats.session_id,
            stats.duration_secs,
            stats.client_to_upstream.audio_frames,
            stats.upstream_to_client.audio_frames
        );

        stats
    }

    /// Flush the recording and close both legs
    ///
    /// Only the first call does anything; later calls return `false`.
    pub async fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;

        if let Some(mut recorder) = self.recorder.take() {
            match tokio::task::spawn_blocking(move || recorder.flush()).await {
                Ok(Ok(Some(summary))) => self.recorded_secs = Some(summary.duration_secs),
                Ok(Ok(None)) => debug!("No audio recorded for session {}", self.id),
                Ok(Err(e)) => error!("Failed to save recording for session {}: {}", self.id, e),
                Err(e) => error!("Recording task for session {} failed: {}", self.id, e),
            }
        }

        self.client.close().await;
        self.upstream.close().await;

        info!("Bridge session {} torn down", self.id);
        true
    }
}

/// Let a still-running direction finish on its own for up to `window`
async fn drain<F>(direction: F, window: Duration, label: &str) -> DirectionEnd
where
    F: Future<Output = DirectionEnd> + Unpin,
{
    match tokio::time::timeout(window, direction).await {
        Ok(end) => {
            debug!("{} ended: {:?}", label, end);
            end
        }
        Err(_) => {
            warn!("{} still running after {:?}, stopping it", label, window);
            DirectionEnd::Drained
        }
    }
}
