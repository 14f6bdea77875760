pub mod client;
pub mod messages;
pub mod provider;

pub use client::CallSetupClient;
pub use messages::{CreateCallRequest, CreateCallResponse};
pub use provider::{from_config, JoinUrlProvider, StaticJoinUrl};
