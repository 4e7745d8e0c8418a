use bitvec::prelude::*;
use thiserror::Error;

use crate::engine::{GateDesc, GateKind};

/// Plaintext circuit plus the identifiers that scope its garbling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircuitLayout {
    pub circuit_id: [u8; 32],
    pub instance_id: u64,
    /// Ordered gate list; the position in this vector is the gate index.
    pub gates: Vec<GateDesc>,
}

impl CircuitLayout {
    pub fn new(circuit_id: [u8; 32], instance_id: u64, gates: Vec<GateDesc>) -> Self {
        Self {
            circuit_id,
            instance_id,
            gates,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout has no gates")]
    Empty,
    #[error("layout too short for bit width {bit_width}")]
    TooShort { bit_width: usize },
}

struct ComparatorBuilder {
    gates: Vec<GateDesc>,
    next_wire: u16,
}

impl ComparatorBuilder {
    fn new(bit_width: usize) -> Self {
        // Input wires come first: x bits, then y bits.
        Self {
            gates: Vec::new(),
            next_wire: (bit_width * 2) as u16,
        }
    }

    fn push(&mut self, kind: GateKind, a: u16, b: u16) -> u16 {
        let out = self.next_wire;
        self.gates.push(GateDesc::new(kind, a, b, out));
        self.next_wire += 1;
        out
    }

    fn xor(&mut self, a: u16, b: u16) -> u16 {
        self.push(GateKind::Xor, a, b)
    }

    fn and(&mut self, a: u16, b: u16) -> u16 {
        self.push(GateKind::And, a, b)
    }

    fn not(&mut self, a: u16) -> u16 {
        self.push(GateKind::Not, a, 0)
    }

    // OR lowered to `(a XOR b) XOR (a AND b)` so the gate set stays minimal.
    fn or(&mut self, a: u16, b: u16) -> u16 {
        let sum = self.xor(a, b);
        let carry = self.and(a, b);
        self.xor(sum, carry)
    }
}

/// Builds the deterministic `x > y` comparator for `bit_width`-bit inputs.
///
/// Wires `0..bit_width` carry x bits, `bit_width..2*bit_width` carry y bits,
/// both LSB first. The circuit scans from the most significant bit keeping
/// two running wires: "x already won on a higher bit" and "all higher bits
/// equal".
pub fn build_comparator(bit_width: usize) -> Vec<GateDesc> {
    assert!(bit_width > 0, "bit_width must be positive");
    assert!(
        bit_width <= (u16::MAX as usize) / 4,
        "bit_width exhausts the u16 wire space"
    );

    let mut builder = ComparatorBuilder::new(bit_width);
    let mut acc: Option<(u16, u16)> = None;

    for bit in (0..bit_width).rev() {
        let x = bit as u16;
        let y = (bit + bit_width) as u16;

        let diff = builder.xor(x, y);
        let eq_bit = builder.not(diff);
        let not_y = builder.not(y);
        let gt_bit = builder.and(x, not_y);

        acc = Some(match acc {
            None => (gt_bit, eq_bit),
            Some((gt_prev, eq_prev)) => {
                let carry = builder.and(eq_prev, gt_bit);
                let gt = builder.or(gt_prev, carry);
                let eq = builder.and(eq_prev, eq_bit);
                (gt, eq)
            }
        });
    }

    builder.gates
}

/// Output wire carrying `x > y` for a layout built by [`build_comparator`].
///
/// For a single bit the comparison is the last gate; for wider inputs every
/// round appends the equality accumulator after the greater-than accumulator,
/// so the result sits on the penultimate gate's output.
pub fn comparator_output_wire(gates: &[GateDesc], bit_width: usize) -> Result<u16, LayoutError> {
    if gates.is_empty() {
        return Err(LayoutError::Empty);
    }
    if bit_width == 1 {
        return Ok(gates[gates.len() - 1].wire_c);
    }
    if gates.len() < 2 {
        return Err(LayoutError::TooShort { bit_width });
    }
    Ok(gates[gates.len() - 2].wire_c)
}

/// Plaintext evaluation of a layout over concrete inputs; the sanity oracle
/// for the garbled path.
pub fn evaluate_plain(gates: &[GateDesc], bit_width: usize, x: u64, y: u64, output_wire: u16) -> bool {
    let mut top = (2 * bit_width).saturating_sub(1) as u16;
    for gate in gates {
        top = top.max(gate.wire_a).max(gate.wire_b).max(gate.wire_c);
    }
    let mut wires = bitvec![0; top as usize + 1];

    for idx in 0..bit_width {
        wires.set(idx, (x >> idx) & 1 == 1);
        wires.set(bit_width + idx, (y >> idx) & 1 == 1);
    }

    for gate in gates {
        let a = wires[gate.wire_a as usize] as u8;
        let b = wires[gate.wire_b as usize] as u8;
        wires.set(gate.wire_c as usize, gate.kind.apply(a, b) == 1);
    }

    wires[output_wire as usize]
}
