use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Why a forwarding direction stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum DirectionEnd {
    /// The leg it reads from closed
    SourceClosed,
    /// Reading from the source leg failed
    SourceError(String),
    /// Writing to the destination leg failed
    SinkFailed(String),
    /// Still running when the drain window after the other direction ran out
    Drained,
}

/// Live counters for one forwarding direction
#[derive(Debug, Default)]
pub struct DirectionCounters {
    audio_frames: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    text_messages: AtomicU64,
}

impl DirectionCounters {
    pub fn record_audio(&self, bytes_in: usize, bytes_out: usize) {
        self.audio_frames.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(bytes_in as u64, Ordering::Relaxed);
        self.bytes_out.fetch_add(bytes_out as u64, Ordering::Relaxed);
    }

    pub fn record_text(&self) {
        self.text_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, ended: DirectionEnd) -> DirectionStats {
        DirectionStats {
            audio_frames: self.audio_frames.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
            text_messages: self.text_messages.load(Ordering::Relaxed),
            ended,
        }
    }
}

/// Totals for one direction once the session is over
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionStats {
    /// Audio frames forwarded
    pub audio_frames: u64,
    /// Audio bytes received from the source leg
    pub bytes_in: u64,
    /// Audio bytes sent to the destination leg after conversion
    pub bytes_out: u64,
    /// Control messages passed through
    pub text_messages: u64,
    pub ended: DirectionEnd,
}

/// Summary of a finished bridge session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub client_to_upstream: DirectionStats,
    pub upstream_to_client: DirectionStats,
    /// Seconds of audio captured by the recorder, if one was written
    pub recorded_secs: Option<f64>,
}
