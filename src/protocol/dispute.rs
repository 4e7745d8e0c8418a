use crate::commitment::{ih, merkle};
use crate::engine::{GateDesc, LEAF_LEN, garble_leaf};

use super::errors::ProtocolError;

/// A single-gate fraud claim against an opened instance.
///
/// `leaf_bytes` is the 71-byte leaf the challenger claims the garbler
/// committed to; the two proofs tie it to the committed circuit root and the
/// gate descriptor to the committed layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateChallenge {
    pub instance_id: usize,
    pub gate_index: u64,
    pub gate: GateDesc,
    pub leaf_bytes: Vec<u8>,
    pub ih_proof: Vec<[u8; 32]>,
    pub layout_proof: Vec<[u8; 32]>,
}

/// What the adjudicator concluded about the committed leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum LeafFinding {
    /// Committed leaf equals the seed-derived leaf; the challenge was false.
    Honest,
    /// Committed leaf diverges from the seed-derived leaf; fraud proven.
    Forged,
}

/// Verifies a challenge's proofs, then re-derives the leaf from the revealed
/// seed and compares.
///
/// Proof failures are errors, not adjudications: a malformed challenge is
/// rejected without slashing anybody. Only a challenge whose proofs hold
/// produces a finding, and the finding decides who forfeits.
pub(super) fn adjudicate(
    challenge: &GateChallenge,
    circuit_id: [u8; 32],
    layout_root: [u8; 32],
    root_gc: [u8; 32],
    seed: [u8; 32],
) -> Result<LeafFinding, ProtocolError> {
    let layout_leaf = merkle::layout_leaf(challenge.gate_index, challenge.gate);
    if !merkle::verify(layout_leaf, &challenge.layout_proof, layout_root) {
        return Err(ProtocolError::LayoutProof);
    }

    if challenge.leaf_bytes.len() != LEAF_LEN {
        return Err(ProtocolError::LeafLength {
            expected: LEAF_LEN,
            got: challenge.leaf_bytes.len(),
        });
    }

    let block = ih::block_hash(challenge.gate_index, &challenge.leaf_bytes);
    if !ih::verify_chain_proof(block, &challenge.ih_proof, root_gc) {
        return Err(ProtocolError::ChainProof);
    }

    let expected = garble_leaf(
        seed,
        circuit_id,
        challenge.instance_id as u64,
        challenge.gate_index,
        challenge.gate,
    );

    if expected[..] == challenge.leaf_bytes[..] {
        Ok(LeafFinding::Honest)
    } else {
        Ok(LeafFinding::Forged)
    }
}
