use async_trait::async_trait;
use tracing::{error, info};

use super::messages::{CreateCallRequest, CreateCallResponse};
use super::provider::JoinUrlProvider;
use crate::config::UpstreamConfig;
use crate::error::{BridgeError, BridgeResult};

/// Creates a call on the upstream voice API and hands back its join URL
pub struct CallSetupClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    request: CreateCallRequest,
}

impl CallSetupClient {
    pub fn new(config: &UpstreamConfig) -> BridgeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BridgeError::Bootstrap(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.resolved_api_key(),
            request: CreateCallRequest::from_config(config),
        })
    }
}

#[async_trait]
impl JoinUrlProvider for CallSetupClient {
    async fn join_url(&self) -> BridgeResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BridgeError::Bootstrap("no API key configured".to_string()))?;

        info!("Requesting upstream call from {}", self.api_url);

        let response = self
            .http
            .post(&self.api_url)
            .header("X-API-Key", api_key)
            .json(&self.request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                error!("Call setup request failed: {}", e);
                BridgeError::Bootstrap(format!("call setup request failed: {}", e))
            })?;

        let body: CreateCallResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Bootstrap(format!("invalid call setup response: {}", e)))?;

        body.join_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| BridgeError::Bootstrap("call setup response had no joinUrl".to_string()))
    }

    fn name(&self) -> &str {
        "call-setup"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let config = UpstreamConfig {
            api_url: "http://127.0.0.1:9/unreachable".to_string(),
            api_key: Some(String::new()),
            ..UpstreamConfig::default()
        };
        let mut client = CallSetupClient::new(&config).unwrap();
        client.api_key = None;

        let err = client.join_url().await.unwrap_err();
        assert!(matches!(err, BridgeError::Bootstrap(msg) if msg.contains("API key")));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_bootstrap_failure() {
        let config = UpstreamConfig {
            api_url: "http://127.0.0.1:9/unreachable".to_string(),
            api_key: Some("test-key".to_string()),
            request_timeout_secs: 2,
            ..UpstreamConfig::default()
        };
        let client = CallSetupClient::new(&config).unwrap();

        let err = client.join_url().await.unwrap_err();
        assert!(matches!(err, BridgeError::Bootstrap(_)));
    }
}
