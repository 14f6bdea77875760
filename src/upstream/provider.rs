use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::client::CallSetupClient;
use crate::config::UpstreamConfig;
use crate::error::{BridgeError, BridgeResult};

/// Source of the upstream WebSocket target for a new session
///
/// Implementations:
/// - [`CallSetupClient`]: creates a call over HTTP per session
/// - [`StaticJoinUrl`]: a fixed, pre-provisioned target
#[async_trait]
pub trait JoinUrlProvider: Send + Sync {
    /// Get the URL to dial for one session
    async fn join_url(&self) -> BridgeResult<String>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Always hands out the same target
pub struct StaticJoinUrl {
    url: String,
}

impl StaticJoinUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl JoinUrlProvider for StaticJoinUrl {
    async fn join_url(&self) -> BridgeResult<String> {
        if self.url.is_empty() {
            return Err(BridgeError::Bootstrap("empty join URL".to_string()));
        }
        Ok(self.url.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Pick the provider the configuration asks for
pub fn from_config(config: &UpstreamConfig) -> BridgeResult<Arc<dyn JoinUrlProvider>> {
    let provider: Arc<dyn JoinUrlProvider> = match &config.join_url {
        Some(url) => Arc::new(StaticJoinUrl::new(url.clone())),
        None => Arc::new(CallSetupClient::new(config)?),
    };

    info!("Upstream targets from {} provider", provider.name());

    Ok(provider)
}
