//! Topic-agnostic JSON payload decoding
//!
//! The decoder knows nothing about which queue or topic a payload came
//! from; the caller supplies the target shape.

use crate::Result;
use serde::de::DeserializeOwned;

/// Decode a raw payload into the caller-supplied shape
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
