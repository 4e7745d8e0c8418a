use std::fmt;
use std::ops::BitXor;

use super::hash::{be_u256, keccak};

/// A 16-byte wire label.
///
/// The low bit of byte 0 is the point-and-permute selector; the remaining
/// 127 bits are pseudo-random keying material. For every wire there are
/// exactly two labels with complementary selector bits.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Label(pub [u8; 16]);

impl Label {
    pub const LEN: usize = 16;

    /// Point-and-permute selector bit.
    pub fn permutation_bit(&self) -> u8 {
        self.0[0] & 1
    }

    /// Left-aligns the label in a 32-byte word with a zero tail, the
    /// settlement and anchor-preimage encoding.
    pub fn to_bytes32(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..Self::LEN].copy_from_slice(&self.0);
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", hex::encode(self.0))
    }
}

impl BitXor for Label {
    type Output = Label;

    fn bitxor(mut self, rhs: Label) -> Label {
        for i in 0..Self::LEN {
            self.0[i] ^= rhs.0[i];
        }
        self
    }
}

/// Per-wire flip bit hiding which label carries which semantic bit.
///
/// A label's selector bit is `flip XOR semantic`, so the evaluator can index
/// table rows by what it observes without learning semantics.
pub fn flip_bit(seed: [u8; 32], circuit_id: [u8; 32], instance_id: u64, wire: u16) -> u8 {
    let instance = be_u256(instance_id);
    let digest = keccak(&[b"P", &circuit_id, &instance, &wire.to_be_bytes(), &seed]);
    digest[31] & 1
}

/// Deterministic label for `(wire, semantic_bit)`.
///
/// The first 16 bytes of the domain-`"L"` digest, with byte 0's low bit
/// rewritten to `flip XOR semantic`; the other 127 bits stay as hashed.
pub fn wire_label(
    seed: [u8; 32],
    circuit_id: [u8; 32],
    instance_id: u64,
    wire: u16,
    semantic_bit: u8,
) -> Label {
    let instance = be_u256(instance_id);
    let bit = [semantic_bit & 1];
    let digest = keccak(&[b"L", &circuit_id, &instance, &wire.to_be_bytes(), &bit, &seed]);

    let mut label = [0u8; Label::LEN];
    label.copy_from_slice(&digest[..Label::LEN]);

    let flip = flip_bit(seed, circuit_id, instance_id, wire);
    label[0] = (label[0] & 0xFE) | (flip ^ (semantic_bit & 1));
    Label(label)
}
