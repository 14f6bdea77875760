use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable the call-setup API key is read from when the config
/// file does not carry one.
pub const API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub relay: RelayConfig,
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voice-bridge".to_string(),
        }
    }
}

/// Where client legs connect
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Seconds between pings to the client; 0 turns pinging off
    pub ping_interval_secs: u64,
    /// A client silent for this long is considered gone
    pub ping_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8765,
            ping_interval_secs: 20,
            ping_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Client keepalive settings, `None` when pinging is off
    pub fn heartbeat(&self) -> Option<Heartbeat> {
        if self.ping_interval_secs == 0 {
            return None;
        }
        Some(Heartbeat {
            interval: Duration::from_secs(self.ping_interval_secs),
            timeout: Duration::from_secs(self.ping_timeout_secs),
        })
    }
}

/// How often the client is pinged and how long it may stay silent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub interval: Duration,
    pub timeout: Duration,
}

/// Call setup for the upstream voice endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub api_url: String,
    /// Falls back to the `API_KEY` environment variable
    pub api_key: Option<String>,
    /// Fixed upstream target; when set no call-setup request is made
    pub join_url: Option<String>,
    pub system_prompt: String,
    pub model: String,
    pub voice: String,
    /// Sample rate announced for both directions of the upstream socket
    pub sample_rate: u32,
    pub first_speaker: String,
    pub request_timeout_secs: u64,
    /// Limit on the upstream WebSocket handshake
    pub connect_timeout_secs: u64,
    pub vad: VadConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.ultravox.ai/api/calls".to_string(),
            api_key: None,
            join_url: None,
            system_prompt:
                "You are a helpful assistant. Please respond naturally and engage in conversation."
                    .to_string(),
            model: "fixie-ai/ultravox".to_string(),
            voice: "Riya-Rao-English-Indian".to_string(),
            sample_rate: 8000,
            first_speaker: "FIRST_SPEAKER_AGENT".to_string(),
            request_timeout_secs: 10,
            connect_timeout_secs: 10,
            vad: VadConfig::default(),
        }
    }
}

impl UpstreamConfig {
    /// API key from config, else from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Turn detection settings forwarded verbatim in the call-setup request
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    pub turn_endpoint_delay: String,
    pub minimum_turn_duration: String,
    pub minimum_interruption_duration: String,
    pub frame_activation_threshold: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            turn_endpoint_delay: "0.5s".to_string(),
            minimum_turn_duration: "0.1s".to_string(),
            minimum_interruption_duration: "0.2s".to_string(),
            frame_activation_threshold: 0.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// How long the surviving direction may keep running once the other
    /// direction has ended
    pub drain_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            drain_timeout_ms: 2000,
        }
    }
}

impl RelayConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub enabled: bool,
    /// `{session}` is replaced with the session id
    pub output_path: String,
    pub source_sample_rate: u32,
    pub target_sample_rate: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_path: "recordings/call.wav".to_string(),
            source_sample_rate: 8000,
            target_sample_rate: 16000,
        }
    }
}

impl Config {
    /// Load from an optional TOML file, then `VOICE_BRIDGE__SECTION__KEY`
    /// environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOICE_BRIDGE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port cannot be 0");
        }
        if self.server.ping_interval_secs > 0
            && self.server.ping_timeout_secs < self.server.ping_interval_secs
        {
            bail!("server.ping_timeout_secs must be at least server.ping_interval_secs");
        }
        if self.upstream.connect_timeout_secs == 0 {
            bail!("upstream.connect_timeout_secs must be greater than 0");
        }
        if self.upstream.sample_rate == 0 {
            bail!("upstream.sample_rate must be greater than 0");
        }
        if self.recording.source_sample_rate == 0 || self.recording.target_sample_rate == 0 {
            bail!("recording sample rates must be greater than 0");
        }
        if self.upstream.join_url.is_none() && self.upstream.api_url.is_empty() {
            bail!("either upstream.join_url or upstream.api_url must be set");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
