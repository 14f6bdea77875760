//! The two forwarding loops of a bridged call.
//!
//! Each loop reads one leg until it closes and writes converted frames to the
//! other leg. Frames keep their order within a direction. A failure ends only
//! the loop that hit it.

use futures::{future, Sink, Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::leg::{Leg, LegMessage};
use super::stats::{DirectionCounters, DirectionEnd};
use crate::audio::{codec, CallRecorder};
use crate::config::Heartbeat;
use crate::error::BridgeResult;

/// Pings the client on a fixed interval and tracks when it was last heard from
struct KeepAlive {
    ticks: Interval,
    timeout: Duration,
    last_seen: Instant,
}

impl KeepAlive {
    fn new(heartbeat: Heartbeat) -> Self {
        let mut ticks = time::interval_at(Instant::now() + heartbeat.interval, heartbeat.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticks,
            timeout: heartbeat.timeout,
            last_seen: Instant::now(),
        }
    }

    fn expired(&self) -> bool {
        self.last_seen.elapsed() >= self.timeout
    }
}

/// Next ping tick, or never when pinging is off
async fn next_ping(keepalive: &mut Option<KeepAlive>) {
    match keepalive {
        Some(keepalive) => {
            keepalive.ticks.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

/// Forward client frames upstream, decoding µ-law audio to PCM16
///
/// With a `heartbeat` the client is pinged while idle, and the loop ends with
/// [`DirectionEnd::SourceError`] once the client has sent nothing, pongs
/// included, for longer than the heartbeat timeout.
pub async fn client_to_upstream<St, C, U>(
    source: St,
    client: &Leg<C>,
    upstream: &Leg<U>,
    heartbeat: Option<Heartbeat>,
    counters: &DirectionCounters,
) -> DirectionEnd
where
    St: Stream<Item = BridgeResult<LegMessage>>,
    C: Sink<LegMessage> + Unpin + Send,
    C::Error: Display,
    U: Sink<LegMessage> + Unpin + Send,
    U::Error: Display,
{
    futures::pin_mut!(source);
    let mut keepalive = heartbeat.map(KeepAlive::new);

    loop {
        let item = tokio::select! {
            item = source.next() => item,
            _ = next_ping(&mut keepalive) => {
                if let Some(keepalive) = &keepalive {
                    if keepalive.expired() {
                        warn!("Client silent for {:?}, dropping it", keepalive.timeout);
                        client.mark_closed();
                        return DirectionEnd::SourceError(format!(
                            "client heartbeat timed out after {:?}",
                            keepalive.timeout
                        ));
                    }
                }
                if let Err(e) = client.send(LegMessage::Ping(Vec::new())).await {
                    warn!("Pinging client failed: {}", e);
                    return DirectionEnd::SourceError(e.to_string());
                }
                continue;
            }
        };

        let Some(item) = item else {
            break;
        };
        if let Some(keepalive) = keepalive.as_mut() {
            keepalive.last_seen = Instant::now();
        }

        let message = match item {
            Ok(message) => message,
            Err(e) => {
                warn!("Error reading client leg: {}", e);
                client.mark_closed();
                return DirectionEnd::SourceError(e.to_string());
            }
        };

        match message {
            LegMessage::Binary(codes) => {
                if codes.is_empty() {
                    debug!("Skipping empty client audio frame");
                    continue;
                }

                let pcm = codec::decode_frame(&codes);
                let (bytes_in, bytes_out) = (codes.len(), pcm.len());

                match upstream.send(LegMessage::Binary(pcm)).await {
                    Ok(true) => counters.record_audio(bytes_in, bytes_out),
                    Ok(false) => debug!("Upstream leg closed, dropping {} byte frame", bytes_in),
                    Err(e) => {
                        warn!("Forwarding audio upstream failed: {}", e);
                        return DirectionEnd::SinkFailed(e.to_string());
                    }
                }
            }
            LegMessage::Text(text) => {
                info!("Client message: {}", text);

                match upstream.send(LegMessage::Text(text)).await {
                    Ok(true) => counters.record_text(),
                    Ok(false) => debug!("Upstream leg closed, dropping client message"),
                    Err(e) => {
                        warn!("Forwarding client message upstream failed: {}", e);
                        return DirectionEnd::SinkFailed(e.to_string());
                    }
                }
            }
            LegMessage::Pong(_) => debug!("Client pong"),
            LegMessage::Ping(_) => {}
        }
    }

    info!("Client connection closed");
    client.mark_closed();
    DirectionEnd::SourceClosed
}

/// Forward upstream frames to the client, encoding PCM16 audio to µ-law
///
/// Audio is tapped into `recorder` before encoding when recording is on.
pub async fn upstream_to_client<St, C, U>(
    source: St,
    upstream: &Leg<U>,
    client: &Leg<C>,
    mut recorder: Option<&mut CallRecorder>,
    counters: &DirectionCounters,
) -> DirectionEnd
where
    St: Stream<Item = BridgeResult<LegMessage>>,
    C: Sink<LegMessage> + Unpin + Send,
    C::Error: Display,
    U: Sink<LegMessage> + Unpin + Send,
    U::Error: Display,
{
    futures::pin_mut!(source);

    while let Some(item) = source.next().await {
        let message = match item {
            Ok(message) => message,
            Err(e) => {
                warn!("Error reading upstream leg: {}", e);
                upstream.mark_closed();
                return DirectionEnd::SourceError(e.to_string());
            }
        };

        match message {
            LegMessage::Binary(data) => {
                let whole = data.len() - data.len() % 2;
                if whole != data.len() {
                    debug!("Dropping trailing byte of {} byte upstream frame", data.len());
                }
                if whole == 0 {
                    continue;
                }
                let pcm = &data[..whole];

                if let Some(recorder) = recorder.as_deref_mut() {
                    recorder.append(pcm);
                }

                let codes = codec::encode_frame(pcm);
                let (bytes_in, bytes_out) = (data.len(), codes.len());

                match client.send(LegMessage::Binary(codes)).await {
                    Ok(true) => counters.record_audio(bytes_in, bytes_out),
                    Ok(false) => debug!("Client leg closed, dropping {} byte frame", bytes_in),
                    Err(e) => {
                        warn!("Forwarding audio to client failed: {}", e);
                        return DirectionEnd::SinkFailed(e.to_string());
                    }
                }
            }
            LegMessage::Text(text) => {
                debug!("Upstream message: {}", text);

                match client.send(LegMessage::Text(text)).await {
                    Ok(true) => counters.record_text(),
                    Ok(false) => debug!("Client leg closed, dropping upstream message"),
                    Err(e) => {
                        warn!("Forwarding upstream message to client failed: {}", e);
                        return DirectionEnd::SinkFailed(e.to_string());
                    }
                }
            }
            LegMessage::Ping(_) | LegMessage::Pong(_) => {}
        }
    }

    info!("Upstream connection closed");
    upstream.mark_closed();
    DirectionEnd::SourceClosed
}
