//! Content hashing
//!
//! SHA-256 digests used for two things:
//! - Content-addressed image identifiers (`img_<hex>`)
//! - Deterministic 32-bit generation seeds

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Prefix carried by every content-addressed image identifier
pub const IMAGE_ID_PREFIX: &str = "img_";

/// Compute the lowercase hex SHA-256 digest of UTF-8 text
pub fn digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive a generation seed from text
///
/// The seed is the first 32 bits of the SHA-256 digest read as a big-endian
/// unsigned integer, so it is identical on every platform.
pub fn seed_from(text: &str) -> u32 {
    let hash = Sha256::digest(text.as_bytes());
    u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]])
}

/// Content-addressed identifier for a JSON payload
///
/// The payload is serialized compactly with fields in declaration order, so a
/// given struct value always maps to the same id.
pub fn image_id<T: Serialize>(payload: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(payload)?;
    Ok(format!("{}{}", IMAGE_ID_PREFIX, digest(&json)))
}
