// Session I/O bridge for a browser-style remote shell client
//
// Owns the event channel and terminal surface of one session, tracks the
// connection lifecycle and drives the transcript and geometry negotiation.

pub mod bridge;
pub mod channel;
pub mod cli;
pub mod config;
pub mod connection;
pub mod replay;

// Re-export public API
pub use bridge::{BridgeCommand, BridgeError, SessionBridge, SessionView};
pub use channel::{ChannelError, ChannelSignal, EventChannel, LoopbackChannel, LoopbackPeer};
pub use cli::{Cli, Commands};
pub use config::BridgeConfig;
pub use connection::{ConnectionEvent, ConnectionMonitor, ConnectionState};
pub use replay::{replay_frames, ReplayOptions, ReplayReport};
