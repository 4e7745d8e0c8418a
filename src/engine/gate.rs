use serde::{Deserialize, Serialize};

use super::gate_type::GateKind;
use super::hash::{be_u256, keccak};
use super::label::{Label, flip_bit, wire_label};

/// Packed gate-leaf length: opcode, three wire ids, four 16-byte rows.
pub const LEAF_LEN: usize = 71;

const ROW_BASE: usize = 7;

/// One gate of the plaintext circuit layout.
///
/// The descriptor at a given gate index is fixed across all instances of a
/// session; `wire_b` is zero for NOT gates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDesc {
    pub kind: GateKind,
    pub wire_a: u16,
    pub wire_b: u16,
    pub wire_c: u16,
}

impl GateDesc {
    pub fn new(kind: GateKind, wire_a: u16, wire_b: u16, wire_c: u16) -> Self {
        Self {
            kind,
            wire_a,
            wire_b,
            wire_c,
        }
    }

    /// Canonical NOT descriptor with `wire_b` pinned to zero.
    pub fn not(wire_a: u16, wire_c: u16) -> Self {
        Self::new(GateKind::Not, wire_a, 0, wire_c)
    }
}

/// Row-selection key for one `(permA, permB)` cell of a gate's table.
pub fn row_key(
    circuit_id: [u8; 32],
    instance_id: u64,
    gate_index: u64,
    perm_a: u8,
    perm_b: u8,
    label_a: Label,
    label_b: Label,
) -> [u8; 32] {
    let instance = be_u256(instance_id);
    let gate = be_u256(gate_index);
    keccak(&[
        b"K",
        &circuit_id,
        &instance,
        &gate,
        &[perm_a & 1],
        &[perm_b & 1],
        &label_a.0,
        &label_b.0,
    ])
}

/// One-time pad for a row ciphertext: first 16 bytes of the domain-`"PAD"`
/// digest of the row key.
pub fn row_pad(key: [u8; 32]) -> Label {
    let digest = keccak(&[b"PAD", &key]);
    let mut out = [0u8; Label::LEN];
    out.copy_from_slice(&digest[..Label::LEN]);
    Label(out)
}

/// Recomputes the full 71-byte leaf for one gate.
///
/// This is the shared prover/verifier path: the garbler calls it to build
/// commitments, the adjudicator calls it from a revealed seed to judge a
/// challenge. Rows are stored at index `2*permA + permB` and NOT leaves keep
/// all rows zero.
pub fn garble_leaf(
    seed: [u8; 32],
    circuit_id: [u8; 32],
    instance_id: u64,
    gate_index: u64,
    gate: GateDesc,
) -> [u8; LEAF_LEN] {
    let mut rows = [[0u8; Label::LEN]; 4];

    if gate.kind.has_rows() {
        let flip_a = flip_bit(seed, circuit_id, instance_id, gate.wire_a);
        let flip_b = flip_bit(seed, circuit_id, instance_id, gate.wire_b);

        for perm_a in 0..=1u8 {
            for perm_b in 0..=1u8 {
                // Semantic bit is permutation XOR flip.
                let bit_a = perm_a ^ flip_a;
                let bit_b = perm_b ^ flip_b;
                let out_bit = gate.kind.apply(bit_a, bit_b);

                let label_a = wire_label(seed, circuit_id, instance_id, gate.wire_a, bit_a);
                let label_b = wire_label(seed, circuit_id, instance_id, gate.wire_b, bit_b);
                let out_label = wire_label(seed, circuit_id, instance_id, gate.wire_c, out_bit);

                let key = row_key(
                    circuit_id,
                    instance_id,
                    gate_index,
                    perm_a,
                    perm_b,
                    label_a,
                    label_b,
                );

                rows[(2 * perm_a + perm_b) as usize] = (out_label ^ row_pad(key)).0;
            }
        }
    }

    encode_leaf(gate, rows)
}

/// Packs the gate header and rows into the wire format:
/// `kind(1) || wireA(2 BE) || wireB(2 BE) || wireC(2 BE) || row0..row3`.
pub fn encode_leaf(gate: GateDesc, rows: [[u8; 16]; 4]) -> [u8; LEAF_LEN] {
    let mut out = [0u8; LEAF_LEN];
    out[0] = gate.kind as u8;
    out[1..3].copy_from_slice(&gate.wire_a.to_be_bytes());
    out[3..5].copy_from_slice(&gate.wire_b.to_be_bytes());
    out[5..7].copy_from_slice(&gate.wire_c.to_be_bytes());
    for (slot, row) in rows.iter().enumerate() {
        let start = ROW_BASE + Label::LEN * slot;
        out[start..start + Label::LEN].copy_from_slice(row);
    }
    out
}

/// Extracts one row ciphertext from a packed leaf.
pub fn leaf_row(leaf: &[u8; LEAF_LEN], row_index: usize) -> Label {
    debug_assert!(row_index < 4);
    let start = ROW_BASE + Label::LEN * row_index;
    let mut out = [0u8; Label::LEN];
    out.copy_from_slice(&leaf[start..start + Label::LEN]);
    Label(out)
}
