//! Bridged call sessions
//!
//! This module provides the `BridgeSession` abstraction that manages:
//! - The client and upstream legs of one call and their open state
//! - µ-law <-> PCM16 conversion in both forwarding directions
//! - Optional recording of the upstream audio
//! - Teardown and end-of-session statistics

pub mod leg;
pub mod messages;
pub mod relay;
mod session;
mod stats;
pub mod transport;

pub use leg::{Leg, LegMessage};
pub use messages::ControlMessage;
pub use session::BridgeSession;
pub use stats::{DirectionCounters, DirectionEnd, DirectionStats, SessionStats};
pub use transport::{connect_upstream, split_client, split_upstream};
