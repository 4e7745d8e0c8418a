//! The adjudicator: a seven-stage optimistic state machine with a fraud-proof
//! dispute path.
//!
//! The surrounding ledger gives every accepted transition a total order and
//! atomicity; this module models that by owning all state in one [`Session`]
//! value whose transition methods either fully apply or return an error with
//! nothing changed. Wall-clock time enters only as the explicit `now`
//! argument of each transition.

pub mod adjudicator;
pub mod dispute;
pub mod errors;
pub mod session;
pub mod stage;

pub use dispute::GateChallenge;
pub use errors::ProtocolError;
pub use session::{DisputeOutcome, Party, Payout, Session, SettleOutcome, Vault};
pub use stage::{Stage, Timeouts};
