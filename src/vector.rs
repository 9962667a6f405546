//! Binary vector codec and cosine similarity.
//!
//! Vectors are stored as consecutive little-endian IEEE-754 `f32` values with no
//! header, so the encoded length is always `4 * dims`.

use crate::error::{Error, Result};

/// Pack a vector into little-endian `f32` bytes. NaN and infinities keep their bit pattern.
pub fn encode(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Unpack little-endian `f32` bytes. Fails if the length is not a multiple of 4.
pub fn decode(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::MalformedVector { len: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity of two encoded vectors, accumulated in `f64`.
///
/// Returns `Ok(None)` when either vector has zero norm or the dimensions differ;
/// the SQL function maps that to NULL so it sorts last under `order by ... desc`.
pub fn cosine_similarity(a: &[u8], b: &[u8]) -> Result<Option<f64>> {
    let a = decode(a)?;
    let b = decode(b)?;
    Ok(cosine(&a, &b))
}

/// Cosine similarity of two decoded vectors. See [`cosine_similarity`].
pub fn cosine(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Lowercase hex, for passing a vector as a text query parameter.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode hex (either case). Returns `None` on odd length or a non-hex digit.
pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    hex::decode(text).ok()
}
