//! Wire framing: a 4-byte big-endian length prefix followed by JSON.
//!
//! Both ends of the socket perform the same exchange: write one framed
//! envelope, read one framed envelope back. The helpers here cover the three
//! steps each side needs, so the daemon and the CLI share a single bounds
//! check instead of duplicating it:
//!
//! - [`encode_frame`] turns an envelope into a prefixed buffer
//! - [`frame_len`] validates a received prefix and yields the payload size
//! - [`decode_payload`] parses the payload once it has been read

use serde::{Serialize, de::DeserializeOwned};

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

/// Encodes a message into a framed buffer ready for transmission.
pub fn encode_frame<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let payload = serde_json::to_vec(message)?;

    if payload.len() > MAX_MESSAGE_SIZE as usize {
        return Err(ProtocolError::MessageTooLarge {
            size: payload.len() as u32,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Validates a received length prefix and returns the payload size to read.
///
/// Rejects empty frames and frames beyond [`MAX_MESSAGE_SIZE`] before any
/// payload memory is allocated.
pub fn frame_len(prefix: [u8; 4]) -> ProtocolResult<usize> {
    let len = u32::from_be_bytes(prefix);

    if len == 0 {
        return Err(ProtocolError::EmptyMessage);
    }
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    Ok(len as usize)
}

/// Decodes a fully-read payload into a message.
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> ProtocolResult<T> {
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Envelope, ErrorCode, Request, Response};

    fn split_frame(frame: &[u8]) -> ([u8; 4], &[u8]) {
        let prefix: [u8; 4] = frame[..4].try_into().unwrap();
        (prefix, &frame[4..])
    }

    #[test]
    fn request_exchange_through_helpers() {
        let request = Envelope::request(
            "req-1",
            Request::GetSheetValues {
                sheet_alias: "todo".to_string(),
                range: "README!A1".to_string(),
            },
        );

        let frame = encode_frame(&request).unwrap();
        let (prefix, payload) = split_frame(&frame);
        assert_eq!(frame_len(prefix).unwrap(), payload.len());

        let decoded: Envelope<Request> = decode_payload(payload).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn error_response_survives_the_frame() {
        let response = Envelope::response(
            "req-1",
            Response::error(ErrorCode::AccessDenied, "folder F9 is not allowed"),
        );

        let frame = encode_frame(&response).unwrap();
        let (prefix, payload) = split_frame(&frame);
        frame_len(prefix).unwrap();

        let decoded: Envelope<Response> = decode_payload(payload).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn zero_length_prefix_rejected() {
        let result = frame_len(0u32.to_be_bytes());
        assert!(matches!(result, Err(ProtocolError::EmptyMessage)));
    }

    #[test]
    fn oversized_prefix_rejected() {
        let result = frame_len((MAX_MESSAGE_SIZE + 1).to_be_bytes());
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
    }

    #[test]
    fn oversized_payload_refused_at_encode_time() {
        let request = Envelope::request(
            "req-1",
            Request::InsertPrompt {
                sheet_alias: "todo".to_string(),
                tab: "Prompts".to_string(),
                name: "huge".to_string(),
                content: "x".repeat(MAX_MESSAGE_SIZE as usize + 1),
                author: "driveguard".to_string(),
            },
        );

        let result = encode_frame(&request);
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let result: ProtocolResult<Envelope<Request>> = decode_payload(b"not json");
        assert!(matches!(result, Err(ProtocolError::Serialization(_))));
    }
}
