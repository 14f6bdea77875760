use serde::{Deserialize, Serialize};

use crate::config::UpstreamConfig;

/// Body of the call-setup request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    pub system_prompt: String,
    pub model: String,
    pub voice: String,
    pub medium: CallMedium,
    pub vad_settings: VadSettings,
    pub first_speaker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMedium {
    pub server_web_socket: ServerWebSocketMedium,
}

/// Sample rates of the PCM16 the upstream socket sends and expects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerWebSocketMedium {
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VadSettings {
    pub turn_endpoint_delay: String,
    pub minimum_turn_duration: String,
    pub minimum_interruption_duration: String,
    pub frame_activation_threshold: f32,
}

/// The part of the call-setup response the bridge needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallResponse {
    pub join_url: Option<String>,
}

impl CreateCallRequest {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            model: config.model.clone(),
            voice: config.voice.clone(),
            medium: CallMedium {
                server_web_socket: ServerWebSocketMedium {
                    input_sample_rate: config.sample_rate,
                    output_sample_rate: config.sample_rate,
                },
            },
            vad_settings: VadSettings {
                turn_endpoint_delay: config.vad.turn_endpoint_delay.clone(),
                minimum_turn_duration: config.vad.minimum_turn_duration.clone(),
                minimum_interruption_duration: config.vad.minimum_interruption_duration.clone(),
                frame_activation_threshold: config.vad.frame_activation_threshold,
            },
            first_speaker: config.first_speaker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = CreateCallRequest::from_config(&UpstreamConfig::default());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "fixie-ai/ultravox");
        assert_eq!(json["firstSpeaker"], "FIRST_SPEAKER_AGENT");
        assert_eq!(json["medium"]["serverWebSocket"]["inputSampleRate"], 8000);
        assert_eq!(json["medium"]["serverWebSocket"]["outputSampleRate"], 8000);
        assert_eq!(json["vadSettings"]["turnEndpointDelay"], "0.5s");
        assert!(json.get("systemPrompt").is_some());
    }

    #[test]
    fn test_response_join_url() {
        let parsed: CreateCallResponse =
            serde_json::from_str(r#"{"callId":"abc","joinUrl":"wss://example.test/calls/abc"}"#)
                .unwrap();
        assert_eq!(parsed.join_url.as_deref(), Some("wss://example.test/calls/abc"));

        let missing: CreateCallResponse = serde_json::from_str(r#"{"callId":"abc"}"#).unwrap();
        assert!(missing.join_url.is_none());
    }
}
