use serde::{Deserialize, Serialize};

/// Control frames the bridge itself sends to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Upstream is connected and audio may flow
    Connected { message: String },
}

impl ControlMessage {
    pub fn connected() -> Self {
        ControlMessage::Connected {
            message: "Connected to voice bridge".to_string(),
        }
    }
}
