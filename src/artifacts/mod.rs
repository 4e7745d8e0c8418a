//! Prover work-directory persistence and dispute-packet assembly.
//!
//! Everything here is plain text for inspection during a dispute: hex values
//! with an optional `0x` prefix, one value per line, `#` comments and blank
//! lines ignored.

pub mod dispute;
pub mod store;

pub use dispute::{ChallengePlan, DisputeInputs, prepare_challenge};
pub use store::{
    EvalMeta, EvalPackage, decode_hex_array, load_session, parse_hex32_json_list, read_eval_package,
    read_hex_lines, save_session, write_eval_package, write_instance_files,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{path}:{line}: {reason}")]
    BadLine {
        path: String,
        line: usize,
        reason: String,
    },
    #[error("{path}: no usable values")]
    EmptyFile { path: String },
    #[error("{path}: missing key `{key}`")]
    MissingKey { path: String, key: String },
    #[error("invalid hex value `{value}`: {reason}")]
    BadHex { value: String, reason: String },
    #[error("invalid session store: {0}")]
    BadSession(#[from] serde_json::Error),
    #[error("claimed leaves count {got} does not match layout gate count {expected}")]
    LeafCount { expected: usize, got: usize },
    #[error("gate index {index} out of range ({limit} gates)")]
    GateOutOfRange { index: usize, limit: usize },
    #[error("no mismatching gate found; nothing to challenge")]
    NoMismatch,
    #[error(
        "gate {index} matches the seed-derived leaf; enable allow_false_challenge to submit anyway"
    )]
    FalseChallenge { index: usize },
    #[error("claimed leaves fold to root {computed}, expected {expected}")]
    RootMismatch { computed: String, expected: String },
}
