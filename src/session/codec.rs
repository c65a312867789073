//! Wire format for stored sessions
//!
//! Payloads are stored as a versioned JSON envelope:
//!
//! ```json
//! {"v":1,"data":{"user_id":42}}
//! ```
//!
//! Decoding accepts exactly this shape. Anything else, including an envelope
//! with an unknown version, is rejected as corrupt rather than read as empty.

use crate::error::{Result, SessionError};
use crate::traits::session::SessionPayload;
use serde::{Deserialize, Serialize};

/// Current envelope version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    v: u32,
    data: &'a SessionPayload,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    v: u32,
    data: SessionPayload,
}

/// Serialize a payload into stored bytes
pub fn encode(payload: &SessionPayload) -> Result<Vec<u8>> {
    serde_json::to_vec(&EnvelopeRef {
        v: FORMAT_VERSION,
        data: payload,
    })
    .map_err(|e| SessionError::serialization(e.to_string()))
}

/// Deserialize stored bytes back into a payload
pub fn decode(bytes: &[u8]) -> Result<SessionPayload> {
    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|e| SessionError::deserialization(e.to_string()))?;

    if envelope.v != FORMAT_VERSION {
        return Err(SessionError::deserialization(format!(
            "unsupported session format version {} (expected {})",
            envelope.v, FORMAT_VERSION
        )));
    }

    Ok(envelope.data)
}
