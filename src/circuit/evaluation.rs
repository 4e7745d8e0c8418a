use log::debug;
use thiserror::Error;

use crate::engine::{GateKind, LEAF_LEN, Label, leaf_row, row_key, row_pad};

use super::garbling::NotHint;
use super::structure::CircuitLayout;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("leaf count {got} does not match gate count {expected}")]
    LeafCount { expected: usize, got: usize },
    #[error("evaluator input count {got} does not match garbler input count {expected}")]
    InputCount { expected: usize, got: usize },
    #[error("gate {gate} reads wire {wire} before anything wrote it")]
    MissingWire { gate: usize, wire: u16 },
    #[error("gate {gate} is a NOT gate without a matching hint")]
    MissingNotHint { gate: usize },
    #[error("gate {gate}: input label is unknown to its NOT hint")]
    NotHintMismatch { gate: usize },
    #[error("output wire {wire} was never written")]
    MissingOutput { wire: u16 },
}

/// Walks the garbled instance and returns the active output label.
///
/// For table gates the evaluator reads the two selector bits, picks row
/// `2*permA + permB`, and strips the pad rebuilt from the row key. It learns
/// labels, never semantics; whether the result means true or false is decided
/// at settlement against the committed anchors.
pub fn evaluate_instance(
    layout: &CircuitLayout,
    leaves: &[[u8; LEAF_LEN]],
    garbler_labels: &[Label],
    evaluator_labels: &[Label],
    hints: &[NotHint],
    output_wire: u16,
) -> Result<Label, EvalError> {
    if leaves.len() != layout.gates.len() {
        return Err(EvalError::LeafCount {
            expected: layout.gates.len(),
            got: leaves.len(),
        });
    }
    let bit_width = garbler_labels.len();
    if evaluator_labels.len() != bit_width {
        return Err(EvalError::InputCount {
            expected: bit_width,
            got: evaluator_labels.len(),
        });
    }

    let mut top = (2 * bit_width).saturating_sub(1) as u16;
    for gate in &layout.gates {
        top = top.max(gate.wire_a).max(gate.wire_b).max(gate.wire_c);
    }
    let mut wires = vec![None::<Label>; top as usize + 1];

    for (idx, label) in garbler_labels.iter().enumerate() {
        wires[idx] = Some(*label);
    }
    for (idx, label) in evaluator_labels.iter().enumerate() {
        wires[bit_width + idx] = Some(*label);
    }

    for (gate_index, gate) in layout.gates.iter().enumerate() {
        let label_a = wires[gate.wire_a as usize].ok_or(EvalError::MissingWire {
            gate: gate_index,
            wire: gate.wire_a,
        })?;

        let out_label = match gate.kind {
            GateKind::And | GateKind::Xor => {
                let label_b = wires[gate.wire_b as usize].ok_or(EvalError::MissingWire {
                    gate: gate_index,
                    wire: gate.wire_b,
                })?;

                let perm_a = label_a.permutation_bit();
                let perm_b = label_b.permutation_bit();
                let row = leaf_row(&leaves[gate_index], (2 * perm_a + perm_b) as usize);
                let key = row_key(
                    layout.circuit_id,
                    layout.instance_id,
                    gate_index as u64,
                    perm_a,
                    perm_b,
                    label_a,
                    label_b,
                );
                row ^ row_pad(key)
            }
            GateKind::Not => {
                let hint = hints
                    .iter()
                    .find(|hint| hint.gate_index == gate_index)
                    .ok_or(EvalError::MissingNotHint { gate: gate_index })?;
                if label_a == hint.input0 {
                    hint.output0
                } else if label_a == hint.input1 {
                    hint.output1
                } else {
                    return Err(EvalError::NotHintMismatch { gate: gate_index });
                }
            }
        };

        debug!("evaluate: gate={gate_index} out={out_label:?}");
        wires[gate.wire_c as usize] = Some(out_label);
    }

    wires
        .get(output_wire as usize)
        .copied()
        .flatten()
        .ok_or(EvalError::MissingOutput { wire: output_wire })
}
