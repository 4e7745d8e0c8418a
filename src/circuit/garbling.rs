use log::debug;

use crate::engine::{GateKind, LEAF_LEN, Label, garble_leaf, wire_label};

use super::structure::CircuitLayout;

/// Garbles every gate of `layout` in index order.
///
/// The iteration index is consensus-relevant: it feeds the per-gate hashes
/// and the position-bound commitment chain.
pub fn garble_instance(seed: [u8; 32], layout: &CircuitLayout) -> Vec<[u8; LEAF_LEN]> {
    debug!(
        "garble: instance={} gates={}",
        layout.instance_id,
        layout.gates.len()
    );
    layout
        .gates
        .iter()
        .enumerate()
        .map(|(index, gate)| {
            garble_leaf(
                seed,
                layout.circuit_id,
                layout.instance_id,
                index as u64,
                *gate,
            )
        })
        .collect()
}

/// Little-endian bit decomposition; bit 0 maps to the lowest input wire.
pub fn bits_le(value: u64, bit_width: usize) -> Vec<u8> {
    (0..bit_width).map(|idx| ((value >> idx) & 1) as u8).collect()
}

/// Active labels for the garbler's input wires (`0..bit_width`) under her
/// private value.
pub fn garbler_input_labels(
    seed: [u8; 32],
    circuit_id: [u8; 32],
    instance_id: u64,
    bit_width: usize,
    value: u64,
) -> Vec<Label> {
    bits_le(value, bit_width)
        .iter()
        .enumerate()
        .map(|(idx, bit)| wire_label(seed, circuit_id, instance_id, idx as u16, *bit))
        .collect()
}

/// Both labels per evaluator input wire (`bit_width..2*bit_width`), the
/// offer list standing in for the oblivious transfer of the reference flow.
pub fn evaluator_label_pairs(
    seed: [u8; 32],
    circuit_id: [u8; 32],
    instance_id: u64,
    bit_width: usize,
) -> Vec<(Label, Label)> {
    (0..bit_width)
        .map(|idx| {
            let wire = (bit_width + idx) as u16;
            let l0 = wire_label(seed, circuit_id, instance_id, wire, 0);
            let l1 = wire_label(seed, circuit_id, instance_id, wire, 1);
            (l0, l1)
        })
        .collect()
}

/// Semantic `(false, true)` labels for an output wire.
pub fn output_labels(seed: [u8; 32], layout: &CircuitLayout, output_wire: u16) -> (Label, Label) {
    let l0 = wire_label(seed, layout.circuit_id, layout.instance_id, output_wire, 0);
    let l1 = wire_label(seed, layout.circuit_id, layout.instance_id, output_wire, 1);
    (l0, l1)
}

/// Decryption aid for a zero-row NOT gate.
///
/// NOT leaves carry no ciphertext, so the evaluator maps the observed input
/// label through this table instead. `output0` is the output for a semantic-0
/// input, which a NOT gate maps to semantic 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotHint {
    pub gate_index: usize,
    pub input0: Label,
    pub output0: Label,
    pub input1: Label,
    pub output1: Label,
}

/// Hints for every NOT gate of `layout`, in gate order.
pub fn not_hints(seed: [u8; 32], layout: &CircuitLayout) -> Vec<NotHint> {
    layout
        .gates
        .iter()
        .enumerate()
        .filter(|(_, gate)| gate.kind == GateKind::Not)
        .map(|(gate_index, gate)| NotHint {
            gate_index,
            input0: wire_label(seed, layout.circuit_id, layout.instance_id, gate.wire_a, 0),
            output0: wire_label(seed, layout.circuit_id, layout.instance_id, gate.wire_c, 1),
            input1: wire_label(seed, layout.circuit_id, layout.instance_id, gate.wire_a, 1),
            output1: wire_label(seed, layout.circuit_id, layout.instance_id, gate.wire_c, 0),
        })
        .collect()
}
