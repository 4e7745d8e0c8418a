//! Circuit layer: the plaintext comparator layout, deterministic garbling of
//! whole instances, and the garbled evaluator.
//!
//! The layout is agreed plaintext structure (committed through the layout
//! Merkle root); the garbled material on top of it derives entirely from the
//! per-instance seed, so both sides can rebuild any of it byte for byte.

pub mod evaluation;
pub mod garbling;
pub mod structure;

pub use evaluation::{EvalError, evaluate_instance};
pub use garbling::{
    NotHint, bits_le, evaluator_label_pairs, garble_instance, garbler_input_labels, not_hints,
    output_labels,
};
pub use structure::{
    CircuitLayout, LayoutError, build_comparator, comparator_output_wire, evaluate_plain,
};
