//! Wire vocabulary shared by the shellgate crates
//!
//! Every event that crosses the session channel is one of the variants below.
//! Inbound payloads are validated once, when a raw frame is decoded into a
//! [`ServerEvent`]; everything past that point works with typed values.

mod events;
mod geometry;

pub use events::{ClientEvent, ControlAction, DataPayload, Frame, ServerEvent, TerminalOptions};
pub use geometry::SessionGeometry;

use thiserror::Error;

/// Errors raised while decoding frames at the channel boundary
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown inbound event: {0}")]
    UnknownEvent(String),
    #[error("malformed payload for '{event}': {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] serde_json::Error),
}
