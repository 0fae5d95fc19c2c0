//! Wire format: length-prefixed bincode v2 frames.
//!
//! Each message on the wire is:
//!   [4 bytes big-endian length][bincode v2 payload]

use bincode::{Decode, Encode};

use crate::error::ProtocolError;

/// Size of the big-endian length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Default cap on request frames (1 MiB). Larger frames are drained and
/// rejected instead of allocated.
pub const MAX_REQUEST_SIZE: u32 = 1024 * 1024;

/// Cap on response frames read by clients. Responses carry screenshots.
pub const MAX_RESPONSE_SIZE: u32 = 64 * 1024 * 1024;

/// Upper bound on what decoding one message may allocate. Length fields are
/// checked against it before any container is allocated.
pub const DECODE_LIMIT: usize = MAX_RESPONSE_SIZE as usize;

/// Encode a message payload without the length prefix.
pub fn encode_payload<T: Encode>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    bincode::encode_to_vec(msg, bincode::config::standard())
        .map_err(|e| ProtocolError::Serialization(e.to_string()))
}

/// Prefix a payload with its big-endian length.
pub fn frame_payload(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let len = u32::try_from(payload.len())
        .map_err(|_| ProtocolError::Serialization("message too large".to_string()))?;
    let mut buf = Vec::with_capacity(LENGTH_PREFIX + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Encode a message to a length-prefixed byte vector.
pub fn encode_message<T: Encode>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    frame_payload(&encode_payload(msg)?)
}

/// Decode a message from a bincode v2 payload (without the length prefix).
///
/// Trailing bytes after a complete message are rejected: a frame holds
/// exactly one message.
pub fn decode_message<T: Decode<()>>(payload: &[u8]) -> Result<T, ProtocolError> {
    let config = bincode::config::standard().with_limit::<DECODE_LIMIT>();
    let (msg, read) = bincode::decode_from_slice(payload, config)
        .map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    if read != payload.len() {
        return Err(ProtocolError::Malformed(format!(
            "{} trailing bytes after message",
            payload.len() - read
        )));
    }
    Ok(msg)
}
