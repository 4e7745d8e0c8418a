use log::debug;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::circuit::{CircuitLayout, garble_instance, output_labels};
use crate::engine::{GateDesc, LEAF_LEN, be_u256, keccak};

use super::ih;

/// Cut-and-choose width: one evaluation instance, nine audited openings.
/// Cheating on the evaluated instance goes uncaught with probability 1/10.
pub const INSTANCE_COUNT: usize = 10;

/// Per-instance seed from the session master seed, domain-separated so
/// instances cannot share any derived material.
pub fn instance_seed(master_seed: [u8; 32], circuit_id: [u8; 32], instance_id: u64) -> [u8; 32] {
    let instance = be_u256(instance_id);
    keccak(&[b"SEED", &circuit_id, &instance, &master_seed])
}

/// Published commitment to one instance seed.
pub fn seed_commitment(seed: [u8; 32]) -> [u8; 32] {
    keccak(&[&seed])
}

/// Result anchors for an instance: hashes of the 32-byte settlement encoding
/// of the two output labels. `h0` anchors semantic one (`x > y` holds), `h1`
/// semantic zero, so a revealed output label decides the boolean outcome
/// without the adjudicator ever learning labels in advance.
pub fn result_anchors(
    seed: [u8; 32],
    layout: &CircuitLayout,
    output_wire: u16,
) -> ([u8; 32], [u8; 32]) {
    let (label_false, label_true) = output_labels(seed, layout, output_wire);
    let h0 = keccak(&[&label_true.to_bytes32()]);
    let h1 = keccak(&[&label_false.to_bytes32()]);
    (h0, h1)
}

/// On-ledger commitment record for one instance.
///
/// `root_xg` and `root_ot` are reserved commitment slots carried opaquely;
/// the dispute core never consumes them.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceCommitment {
    #[serde_as(as = "Hex")]
    pub com_seed: [u8; 32],
    #[serde_as(as = "Hex")]
    pub root_gc: [u8; 32],
    #[serde_as(as = "Hex")]
    pub root_xg: [u8; 32],
    #[serde_as(as = "Hex")]
    pub root_ot: [u8; 32],
    #[serde_as(as = "Hex")]
    pub h0: [u8; 32],
    #[serde_as(as = "Hex")]
    pub h1: [u8; 32],
}

/// Everything the garbler derives for one instance before committing.
#[derive(Clone, Debug)]
pub struct InstanceArtifacts {
    pub instance_id: usize,
    pub seed: [u8; 32],
    pub com_seed: [u8; 32],
    pub root_gc: [u8; 32],
    pub leaves: Vec<[u8; LEAF_LEN]>,
    pub block_hashes: Vec<[u8; 32]>,
}

impl InstanceArtifacts {
    /// Commitment record with explicit anchors; reserved roots stay zero.
    pub fn commitment(&self, h0: [u8; 32], h1: [u8; 32]) -> InstanceCommitment {
        InstanceCommitment {
            com_seed: self.com_seed,
            root_gc: self.root_gc,
            root_xg: [0u8; 32],
            root_ot: [0u8; 32],
            h0,
            h1,
        }
    }
}

/// Garbles all [`INSTANCE_COUNT`] instances from one master seed.
pub fn build_instances(
    master_seed: [u8; 32],
    circuit_id: [u8; 32],
    gates: &[GateDesc],
) -> Vec<InstanceArtifacts> {
    (0..INSTANCE_COUNT)
        .map(|instance_id| {
            let seed = instance_seed(master_seed, circuit_id, instance_id as u64);
            let layout = CircuitLayout::new(circuit_id, instance_id as u64, gates.to_vec());
            let leaves = garble_instance(seed, &layout);
            let block_hashes: Vec<[u8; 32]> = leaves
                .iter()
                .enumerate()
                .map(|(index, leaf)| ih::block_hash(index as u64, leaf))
                .collect();
            let root_gc = ih::chain_root(&block_hashes);
            debug!("instance {instance_id}: root_gc={}", hex::encode(root_gc));

            InstanceArtifacts {
                instance_id,
                seed,
                com_seed: seed_commitment(seed),
                root_gc,
                leaves,
                block_hashes,
            }
        })
        .collect()
}

/// The full vector the garbler submits in one message.
pub fn commitment_vector(
    master_seed: [u8; 32],
    circuit_id: [u8; 32],
    gates: &[GateDesc],
    output_wire: u16,
) -> Vec<InstanceCommitment> {
    build_instances(master_seed, circuit_id, gates)
        .iter()
        .map(|artifacts| {
            let layout =
                CircuitLayout::new(circuit_id, artifacts.instance_id as u64, gates.to_vec());
            let (h0, h1) = result_anchors(artifacts.seed, &layout, output_wire);
            artifacts.commitment(h0, h1)
        })
        .collect()
}
