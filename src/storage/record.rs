//! On-disk record framing.
//!
//! A record is `u64 id || D × f32 payload`, little-endian, fixed stride
//! `8 + 4·D` bytes. Uses explicit `to_le_bytes`/`from_le_bytes` loops rather
//! than an unsafe pointer cast: this is a fixed wire format, not "however the
//! host happens to lay out a `[f32]`", so it must be endianness-correct
//! independent of the host.

use crate::vector::DELETED;

/// Byte length of a record for vectors of dimension `dimension`.
#[must_use]
pub fn stride(dimension: usize) -> usize {
    8 + 4 * dimension
}

/// Encodes `(id, vector)` into a fresh record buffer.
#[must_use]
pub fn encode(id: u64, vector: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(stride(vector.len()));
    buf.extend_from_slice(&id.to_le_bytes());
    for x in vector {
        buf.extend_from_slice(&x.to_le_bytes());
    }
    buf
}

/// Overwrites the 8-byte id field of an already-encoded record with
/// `DELETED`, producing a tombstone without touching the payload bytes.
#[must_use]
pub fn tombstone_header() -> [u8; 8] {
    DELETED.to_le_bytes()
}

/// Decodes a record of exactly `stride(dimension)` bytes into `(id, vector)`.
///
/// # Panics
///
/// Panics if `bytes.len() != stride(dimension)`. Callers always read exactly
/// one stride at a time, so a length mismatch indicates a caller bug.
#[must_use]
pub fn decode(bytes: &[u8], dimension: usize) -> (u64, Vec<f32>) {
    assert_eq!(
        bytes.len(),
        stride(dimension),
        "record::decode: expected {} bytes, got {}",
        stride(dimension),
        bytes.len()
    );

    let id = u64::from_le_bytes(bytes[0..8].try_into().expect("8-byte id slice"));
    let mut vector = Vec::with_capacity(dimension);
    for chunk in bytes[8..].chunks_exact(4) {
        vector.push(f32::from_le_bytes(chunk.try_into().expect("4-byte f32 slice")));
    }
    (id, vector)
}

/// True if `id` is the tombstone sentinel.
#[must_use]
pub const fn is_tombstone(id: u64) -> bool {
    id == DELETED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_matches_formula() {
        assert_eq!(stride(0), 8);
        assert_eq!(stride(128), 8 + 4 * 128);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let v = vec![1.0_f32, -2.5, 3.25, 0.0];
        let bytes = encode(42, &v);
        assert_eq!(bytes.len(), stride(v.len()));
        let (id, decoded) = decode(&bytes, v.len());
        assert_eq!(id, 42);
        assert_eq!(decoded, v);
    }

    #[test]
    fn test_tombstone_header_decodes_as_deleted() {
        let mut bytes = encode(7, &[1.0, 2.0]);
        bytes[0..8].copy_from_slice(&tombstone_header());
        let (id, _) = decode(&bytes, 2);
        assert!(is_tombstone(id));
    }

    #[test]
    fn test_is_tombstone() {
        assert!(is_tombstone(DELETED));
        assert!(!is_tombstone(0));
        assert!(!is_tombstone(42));
    }
}
