use thiserror::Error;

use super::session::Party;
use super::stage::Stage;

/// Reasons a transition reverts. Every variant leaves the session untouched:
/// no stage change, no balance movement, no slash.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("`{op}` is not valid in stage {stage:?}")]
    WrongStage { op: &'static str, stage: Stage },
    #[error("{caller:?} may not call `{op}`")]
    Unauthorized { op: &'static str, caller: Party },
    #[error("stage {stage:?} deadline {deadline} has passed (now {now})")]
    DeadlineExpired { stage: Stage, deadline: u64, now: u64 },
    #[error("stage {stage:?} deadline {deadline} has not passed yet (now {now})")]
    DeadlinePending { stage: Stage, deadline: u64, now: u64 },
    #[error("deposit must be exactly {expected} units, got {got}")]
    WrongDeposit { expected: u128, got: u128 },
    #[error("{party:?} already deposited")]
    AlreadyDeposited { party: Party },
    #[error("{party:?} has no balance to refund")]
    NothingToRefund { party: Party },
    #[error("commitment vector must have {expected} entries, got {got}")]
    CommitmentCount { expected: usize, got: usize },
    #[error("instance index {index} is out of range [0, {limit})")]
    InstanceOutOfRange { index: usize, limit: usize },
    #[error("opening set must have {expected} entries, got {got}")]
    OpeningCount { expected: usize, got: usize },
    #[error("opening set must not contain the evaluation index {index}")]
    OpeningContainsChosen { index: usize },
    #[error("instance {index} appears twice in the opening set")]
    DuplicateOpening { index: usize },
    #[error("seed for instance {index} does not hash to its commitment")]
    SeedMismatch { index: usize },
    #[error("no seed was revealed for instance {index}")]
    SeedNotRevealed { index: usize },
    #[error("challenged instance {index} is not in the opened set")]
    InstanceNotOpened { index: usize },
    #[error("gate leaf must be {expected} bytes, got {got}")]
    LeafLength { expected: usize, got: usize },
    #[error("layout proof does not bind the gate descriptor to the committed layout root")]
    LayoutProof,
    #[error("incremental-hash proof does not reproduce the committed circuit root")]
    ChainProof,
    #[error("output label matches neither result anchor")]
    UnknownOutputLabel,
}
