//! Commitment layer: the position-bound incremental-hash chain over gate
//! leaves, the layout Merkle tree, and the per-instance commitment records
//! the garbler publishes in one message.

pub mod ih;
pub mod instance;
pub mod merkle;

pub use ih::{block_hash, chain_proof, chain_root, chain_root_from_leaves, verify_chain_proof};
pub use instance::{
    INSTANCE_COUNT, InstanceArtifacts, InstanceCommitment, build_instances, commitment_vector,
    instance_seed, result_anchors, seed_commitment,
};
pub use merkle::{layout_leaf, layout_root};
