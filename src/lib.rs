pub mod audio;
pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod upstream;

pub use audio::{
    decode, decode_frame, encode, encode_frame, resample_linear, CallRecorder, RecordingSummary,
};
pub use bridge::{BridgeSession, DirectionEnd, LegMessage, SessionStats};
pub use config::Config;
pub use error::{BridgeError, BridgeResult};
pub use http::{create_router, serve, AppState};
pub use upstream::{CallSetupClient, JoinUrlProvider, StaticJoinUrl};
