//! Economically secured fair exchange for Yao's millionaires' problem.
//!
//! A Garbler and an Evaluator each post collateral with an adjudicator, then
//! run a cut-and-choose garbled-circuit comparison of their private values.
//! Every byte of the garbled material derives deterministically from a
//! per-instance seed, so a single revealed seed lets the adjudicator re-derive
//! any gate and settle a fraud claim about it.
//!
//! Layer map:
//! - [`engine`]: seed-derived wire labels, point-and-permute rows, and the
//!   71-byte gate-leaf wire format shared by prover and verifier.
//! - [`circuit`]: the comparator layout builder, whole-instance garbling, and
//!   the garbled evaluator.
//! - [`commitment`]: incremental-hash chains over gate leaves, the layout
//!   Merkle tree, and per-instance commitment records.
//! - [`protocol`]: the staged adjudicator holding deposits, openings, and the
//!   dispute verifier that decides who forfeits.
//! - [`artifacts`]: the prover work directory and dispute-packet assembly.

pub mod artifacts;
pub mod circuit;
pub mod commitment;
pub mod engine;
pub mod protocol;

pub use circuit::{CircuitLayout, EvalError, LayoutError, NotHint};
pub use engine::{GateDesc, GateKind, LEAF_LEN, Label};
pub use protocol::{GateChallenge, Party, ProtocolError, Session, Stage, Timeouts};
