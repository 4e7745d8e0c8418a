use crate::engine::{GateDesc, be_u256, keccak};

/// Layout-commitment leaf for one gate:
/// `H(uint256(gateIndex) || kind(1) || wireA(2) || wireB(2) || wireC(2))`.
pub fn layout_leaf(gate_index: u64, gate: GateDesc) -> [u8; 32] {
    let index = be_u256(gate_index);
    keccak(&[
        &index,
        &[gate.kind as u8],
        &gate.wire_a.to_be_bytes(),
        &gate.wire_b.to_be_bytes(),
        &gate.wire_c.to_be_bytes(),
    ])
}

/// Commutative node hash over the sorted pair, so proofs need no left/right
/// direction bits.
pub fn node_hash(a: [u8; 32], b: [u8; 32]) -> [u8; 32] {
    if a <= b {
        keccak(&[&a, &b])
    } else {
        keccak(&[&b, &a])
    }
}

/// Root of the sorted-pair tree. The last node of an odd level pairs with
/// itself.
pub fn root(hashes: &[[u8; 32]]) -> [u8; 32] {
    if hashes.is_empty() {
        return [0u8; 32];
    }

    let mut level = hashes.to_vec();
    while level.len() > 1 {
        level = fold_level(&level);
    }
    level[0]
}

/// Layout root over a whole gate list in natural order.
pub fn layout_root(gates: &[GateDesc]) -> [u8; 32] {
    let hashes: Vec<[u8; 32]> = gates
        .iter()
        .enumerate()
        .map(|(index, gate)| layout_leaf(index as u64, *gate))
        .collect();
    root(&hashes)
}

/// Sibling path for `hashes[index]`.
pub fn proof(hashes: &[[u8; 32]], index: usize) -> Vec<[u8; 32]> {
    assert!(!hashes.is_empty(), "cannot prove against an empty tree");
    assert!(index < hashes.len(), "leaf index out of range");

    let mut path = Vec::new();
    let mut level = hashes.to_vec();
    let mut position = index;

    while level.len() > 1 {
        let sibling = if position % 2 == 0 {
            *level.get(position + 1).unwrap_or(&level[position])
        } else {
            level[position - 1]
        };
        path.push(sibling);

        level = fold_level(&level);
        position /= 2;
    }

    path
}

/// Replays a sibling path and compares against `expected_root`.
pub fn verify(leaf: [u8; 32], path: &[[u8; 32]], expected_root: [u8; 32]) -> bool {
    let mut node = leaf;
    for sibling in path {
        node = node_hash(node, *sibling);
    }
    node == expected_root
}

fn fold_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => node_hash(*left, *right),
            [alone] => node_hash(*alone, *alone),
            _ => unreachable!("chunks(2) yields one- or two-element slices"),
        })
        .collect()
}
