use log::{debug, info};

use crate::circuit::{CircuitLayout, build_comparator, garble_instance};
use crate::commitment::{ih, merkle};
use crate::engine::{GateDesc, LEAF_LEN};
use crate::protocol::GateChallenge;

use super::ArtifactError;

/// Inputs to dispute preparation: what the garbler published for one opened
/// instance, and the seed she revealed for it.
#[derive(Clone, Debug)]
pub struct DisputeInputs {
    pub bit_width: usize,
    pub circuit_id: [u8; 32],
    pub instance_id: u64,
    pub seed: [u8; 32],
    /// The leaves the garbler actually delivered for this instance.
    pub claimed_leaves: Vec<[u8; LEAF_LEN]>,
    /// Challenge this gate instead of the first mismatch.
    pub gate_index: Option<usize>,
    /// Permit challenging a gate whose claimed leaf is correct. The
    /// adjudicator will slash the challenger for it; this exists to exercise
    /// that path, never to win.
    pub allow_false_challenge: bool,
    /// Cross-check the claimed leaves against the committed circuit root.
    pub expected_root_gc: Option<[u8; 32]>,
}

/// A ready-to-submit challenge plus the evidence that motivated it.
#[derive(Clone, Debug)]
pub struct ChallengePlan {
    pub instance_id: u64,
    pub gate_index: usize,
    pub gate: GateDesc,
    pub claimed_leaf: [u8; LEAF_LEN],
    pub expected_leaf: [u8; LEAF_LEN],
    /// Every gate whose claimed leaf diverges from the seed derivation.
    pub mismatches: Vec<usize>,
    pub root_gc: [u8; 32],
    pub layout_root: [u8; 32],
    pub ih_proof: Vec<[u8; 32]>,
    pub layout_proof: Vec<[u8; 32]>,
}

impl ChallengePlan {
    /// The challenge message for `challenge_gate_leaf`.
    pub fn challenge(&self) -> GateChallenge {
        GateChallenge {
            instance_id: self.instance_id as usize,
            gate_index: self.gate_index as u64,
            gate: self.gate,
            leaf_bytes: self.claimed_leaf.to_vec(),
            ih_proof: self.ih_proof.clone(),
            layout_proof: self.layout_proof.clone(),
        }
    }
}

/// Scans the claimed leaves against their seed derivation and assembles the
/// proofs for one challenged gate.
///
/// By default the first mismatching gate is challenged and a challenge
/// against a matching gate is refused, because the adjudicator slashes false
/// challengers.
pub fn prepare_challenge(inputs: &DisputeInputs) -> Result<ChallengePlan, ArtifactError> {
    let gates = build_comparator(inputs.bit_width);
    if inputs.claimed_leaves.len() != gates.len() {
        return Err(ArtifactError::LeafCount {
            expected: gates.len(),
            got: inputs.claimed_leaves.len(),
        });
    }

    let layout = CircuitLayout::new(inputs.circuit_id, inputs.instance_id, gates.clone());
    let expected_leaves = garble_instance(inputs.seed, &layout);

    let mismatches: Vec<usize> = inputs
        .claimed_leaves
        .iter()
        .zip(&expected_leaves)
        .enumerate()
        .filter(|(_, (claimed, expected))| claimed != expected)
        .map(|(index, _)| index)
        .collect();
    debug!(
        "prepare_challenge: instance={} mismatches={mismatches:?}",
        inputs.instance_id
    );

    let gate_index = match inputs.gate_index {
        Some(index) if index >= gates.len() => {
            return Err(ArtifactError::GateOutOfRange {
                index,
                limit: gates.len(),
            });
        }
        Some(index) => index,
        None => *mismatches.first().ok_or(ArtifactError::NoMismatch)?,
    };
    if !mismatches.contains(&gate_index) && !inputs.allow_false_challenge {
        return Err(ArtifactError::FalseChallenge { index: gate_index });
    }

    // Proofs run over what the garbler committed to, i.e. the claimed leaves.
    let blocks: Vec<[u8; 32]> = inputs
        .claimed_leaves
        .iter()
        .enumerate()
        .map(|(index, leaf)| ih::block_hash(index as u64, leaf))
        .collect();
    let root_gc = ih::chain_root(&blocks);
    if let Some(expected_root) = inputs.expected_root_gc {
        if root_gc != expected_root {
            return Err(ArtifactError::RootMismatch {
                computed: hex::encode(root_gc),
                expected: hex::encode(expected_root),
            });
        }
    }

    let layout_hashes: Vec<[u8; 32]> = gates
        .iter()
        .enumerate()
        .map(|(index, gate)| merkle::layout_leaf(index as u64, *gate))
        .collect();

    info!(
        "prepare_challenge: instance={} gate={gate_index} mismatch={}",
        inputs.instance_id,
        mismatches.contains(&gate_index)
    );
    Ok(ChallengePlan {
        instance_id: inputs.instance_id,
        gate_index,
        gate: gates[gate_index],
        claimed_leaf: inputs.claimed_leaves[gate_index],
        expected_leaf: expected_leaves[gate_index],
        mismatches,
        root_gc,
        layout_root: merkle::root(&layout_hashes),
        ih_proof: ih::chain_proof(&blocks, gate_index),
        layout_proof: merkle::proof(&layout_hashes, gate_index),
    })
}
