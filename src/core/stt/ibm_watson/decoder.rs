//! Inbound chunk decoder.
//!
//! The recognition service occasionally writes several JSON objects into one
//! frame with no delimiter (`{...}{...}`), typically an interim result followed
//! by its final version. The decoder turns one raw payload into one JSON value,
//! keeping only the last object of a concatenated run.

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::DecodeError;

/// Marker left behind when two objects are written back to back.
const CONCATENATION_MARKER: &str = "}{";

/// Result of decoding one inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedChunk {
    /// The payload parsed as JSON.
    Json(Value),
    /// The payload could not be parsed; this is the original text, untouched.
    Raw(String),
}

impl DecodedChunk {
    /// The parsed JSON object, if decoding produced one.
    ///
    /// Anything other than a JSON object must be treated as a decode failure.
    pub fn as_object(&self) -> Option<&serde_json::Map<String, Value>> {
        match self {
            Self::Json(value) => value.as_object(),
            Self::Raw(_) => None,
        }
    }

    pub fn is_object(&self) -> bool {
        self.as_object().is_some()
    }
}

/// Decode one inbound payload.
///
/// Payloads without a `}{` marker are parsed directly and a parse failure is
/// an error. Payloads containing the marker must be nothing but objects
/// written back to back; the last one is returned. Anything else, including
/// whitespace or non-object values between them, comes back verbatim as
/// [`DecodedChunk::Raw`].
pub fn decode_chunk(chunk: &str) -> Result<DecodedChunk, DecodeError> {
    if chunk.is_empty() || !chunk.contains(CONCATENATION_MARKER) {
        return serde_json::from_str::<Value>(chunk)
            .map(DecodedChunk::Json)
            .map_err(|e| DecodeError::Parse {
                message: e.to_string(),
                payload: chunk.to_string(),
            });
    }

    match split_adjacent_objects(chunk) {
        Some(mut objects) => match objects.pop() {
            Some(last) => {
                debug!(
                    objects = objects.len() + 1,
                    "Recovered last object from concatenated payload"
                );
                Ok(DecodedChunk::Json(last))
            }
            None => Ok(DecodedChunk::Raw(chunk.to_string())),
        },
        None => {
            warn!("Concatenated payload could not be split");
            Ok(DecodedChunk::Raw(chunk.to_string()))
        }
    }
}

/// Split a run of objects written back to back.
///
/// Every value must be an object and must start exactly where the previous
/// one ended; only surrounding whitespace is tolerated. Braces inside string
/// literals are never mistaken for a boundary.
fn split_adjacent_objects(chunk: &str) -> Option<Vec<Value>> {
    let mut stream = serde_json::Deserializer::from_str(chunk).into_iter::<Value>();
    let mut objects = Vec::new();

    while let Some(next) = stream.next() {
        let value = next.ok()?;
        if !value.is_object() {
            return None;
        }
        objects.push(value);

        let rest = chunk.get(stream.byte_offset()..).unwrap_or_default();
        if !rest.starts_with('{') && !rest.trim().is_empty() {
            return None;
        }
    }

    Some(objects)
}

/// Decode one inbound payload without ever failing.
///
/// Identical to [`decode_chunk`] except that a direct parse failure also yields
/// the original text as [`DecodedChunk::Raw`]. Used wherever a malformed
/// payload must degrade to a reported event rather than an error.
pub fn decode_lenient(chunk: &str) -> DecodedChunk {
    decode_chunk(chunk).unwrap_or_else(|e| {
        debug!(error = %e, "Payload is not JSON; passing it through raw");
        DecodedChunk::Raw(chunk.to_string())
    })
}
