//! Git long-running filter protocol
//!
//! - `pkt_line`: length-prefixed framing shared by both directions
//! - `capability`: capabilities negotiated during the handshake
//! - `session`: the per-process state machine driving clean/smudge commands
//!
//! Anything that leaves the transport in an unknown state is a `ProtocolError`
//! and ends the session; there is no way to resynchronize a pkt-line stream.

pub mod capability;
pub mod pkt_line;
pub mod session;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("truncated packet: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("invalid packet length prefix {0:?}")]
    InvalidLength(String),
    #[error("packet payload of {0} bytes exceeds the maximum of {max}", max = pkt_line::MAX_PAYLOAD)]
    PayloadTooLarge(usize),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("packet is not valid UTF-8 text")]
    InvalidText(#[from] std::string::FromUtf8Error),
    #[error("handshake expected {expected:?}, received {received:?}")]
    Handshake { expected: String, received: String },
    #[error("expected a `{expected}=` line, received {received:?}")]
    UnexpectedKey {
        expected: &'static str,
        received: String,
    },
    #[error("git did not offer the required capability {0:?}")]
    MissingCapability(&'static str),
    #[error("unsupported filter command {0:?}")]
    UnexpectedCommand(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
