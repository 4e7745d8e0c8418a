//! Byte-exact derivation engine shared by the garbler, the evaluator, and the
//! adjudicator's dispute verifier. Everything here is a pure function of
//! `(seed, circuitId, instanceId, ...)`; any divergence between two
//! implementations of this module breaks adjudication.

pub mod gate;
pub mod gate_type;
pub mod hash;
pub mod label;

pub use gate::{GateDesc, LEAF_LEN, encode_leaf, garble_leaf, leaf_row, row_key, row_pad};
pub use gate_type::GateKind;
pub use hash::{be_u256, keccak};
pub use label::{Label, flip_bit, wire_label};
