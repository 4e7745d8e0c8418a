use crate::engine::{LEAF_LEN, be_u256, keccak};

/// Index-bound hash of one gate leaf: `H(uint256(gateIndex) || leafBytes)`.
///
/// Pre-hashing with the index binds each leaf to its position before the
/// chain folds it in.
pub fn block_hash(gate_index: u64, leaf: &[u8]) -> [u8; 32] {
    let index = be_u256(gate_index);
    keccak(&[&index, leaf])
}

/// One fold of the chain: `H(state || block)`.
pub fn fold(state: [u8; 32], block: [u8; 32]) -> [u8; 32] {
    keccak(&[&state, &block])
}

/// Terminal chain state over ordered block hashes, folding from the all-zero
/// state.
pub fn chain_root(blocks: &[[u8; 32]]) -> [u8; 32] {
    let mut state = [0u8; 32];
    for block in blocks {
        state = fold(state, *block);
    }
    state
}

/// Chain root straight from raw leaves.
pub fn chain_root_from_leaves(leaves: &[[u8; LEAF_LEN]]) -> [u8; 32] {
    let blocks: Vec<[u8; 32]> = leaves
        .iter()
        .enumerate()
        .map(|(index, leaf)| block_hash(index as u64, leaf))
        .collect();
    chain_root(&blocks)
}

/// Proof that block `index` sits in the chain.
///
/// Layout: empty for a single-block chain; otherwise the first element is
/// the folded state over blocks `0..index` (the zero state when `index` is 0)
/// and the rest are the block hashes `index+1..` in order.
pub fn chain_proof(blocks: &[[u8; 32]], index: usize) -> Vec<[u8; 32]> {
    assert!(!blocks.is_empty(), "cannot prove against an empty chain");
    assert!(index < blocks.len(), "block index out of range");

    if blocks.len() == 1 {
        return Vec::new();
    }

    let prefix = chain_root(&blocks[..index]);

    let mut proof = Vec::with_capacity(1 + blocks.len() - index - 1);
    proof.push(prefix);
    proof.extend_from_slice(&blocks[index + 1..]);
    proof
}

/// Replays a proof around `block` and compares the terminal state to `root`.
pub fn verify_chain_proof(block: [u8; 32], proof: &[[u8; 32]], root: [u8; 32]) -> bool {
    let prefix = proof.first().copied().unwrap_or([0u8; 32]);
    let mut state = fold(prefix, block);
    for suffix in proof.iter().skip(1) {
        state = fold(state, *suffix);
    }
    state == root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blocks(count: usize) -> Vec<[u8; 32]> {
        (0..count)
            .map(|i| keccak(&[&be_u256(i as u64)]))
            .collect()
    }

    #[test]
    fn test_every_index_proves_against_the_root() {
        for count in 1..=6usize {
            let blocks = sample_blocks(count);
            let root = chain_root(&blocks);
            for index in 0..count {
                let proof = chain_proof(&blocks, index);
                assert!(
                    verify_chain_proof(blocks[index], &proof, root),
                    "count={count} index={index}"
                );
            }
        }
    }

    #[test]
    fn test_single_block_chain_has_empty_proof() {
        let blocks = sample_blocks(1);
        assert!(chain_proof(&blocks, 0).is_empty());
    }

    #[test]
    fn test_first_block_proof_carries_the_zero_prefix() {
        let blocks = sample_blocks(4);
        let proof = chain_proof(&blocks, 0);
        assert_eq!(proof[0], [0u8; 32]);
        assert_eq!(proof.len(), 4);
    }

    #[test]
    fn test_wrong_block_fails_verification() {
        let blocks = sample_blocks(5);
        let root = chain_root(&blocks);
        let proof = chain_proof(&blocks, 2);
        assert!(!verify_chain_proof(blocks[3], &proof, root));
    }

    #[test]
    fn test_tampered_proof_fails_verification() {
        let blocks = sample_blocks(5);
        let root = chain_root(&blocks);
        let mut proof = chain_proof(&blocks, 2);
        proof[0][0] ^= 1;
        assert!(!verify_chain_proof(blocks[2], &proof, root));
    }

    #[test]
    fn test_position_is_bound_into_block_hashes() {
        let leaf = [0x5au8; LEAF_LEN];
        assert_ne!(block_hash(0, &leaf), block_hash(1, &leaf));
    }
}
