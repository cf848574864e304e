//! Wire protocol between the driveguard CLI and the daemon.
//!
//! Messages are JSON payloads framed with a 4-byte big-endian length prefix
//! and wrapped in a versioned [`Envelope`]. The daemon refuses envelopes
//! whose version it does not understand.

pub mod error;
pub mod framing;
pub mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{decode_payload, encode_frame, frame_len};
pub use types::{
    DriveFileInfo, Envelope, ErrorCode, ErrorResponse, Request, Response, StatusInfo,
};

/// Current protocol version.
pub const PROTOCOL_VERSION: &str = "1";

/// Maximum message size in bytes (1 MB).
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;
