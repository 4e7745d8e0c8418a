use sha3::{Digest, Keccak256};

/// Keccak-256 over the concatenation of `parts`.
///
/// This is the one hash function behind every commitment, proof, and anchor
/// in the protocol; no call site may substitute another digest.
pub fn keccak(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Big-endian 32-byte encoding of `value`, the unsigned-256-bit convention
/// used for instance and gate indices inside hash preimages.
pub fn be_u256(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}
