use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::commitment::{INSTANCE_COUNT, InstanceCommitment};

use super::stage::{Stage, Timeouts};

/// Transaction caller identity. The garbler holds the private `x`, builds and
/// commits the circuits; the evaluator holds `y`, picks the evaluation
/// instance, and settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Party {
    Garbler,
    Evaluator,
}

impl Party {
    pub fn counterparty(&self) -> Party {
        match self {
            Party::Garbler => Party::Evaluator,
            Party::Evaluator => Party::Garbler,
        }
    }
}

/// Collateral vault. Balances only move on stage-terminal transitions
/// (settle, abort, slash); everything else is rejected before any mutation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    garbler: u128,
    evaluator: u128,
}

impl Vault {
    pub fn balance(&self, party: Party) -> u128 {
        match party {
            Party::Garbler => self.garbler,
            Party::Evaluator => self.evaluator,
        }
    }

    pub fn total(&self) -> u128 {
        self.garbler + self.evaluator
    }

    pub(super) fn credit(&mut self, party: Party, amount: u128) {
        match party {
            Party::Garbler => self.garbler += amount,
            Party::Evaluator => self.evaluator += amount,
        }
    }

    /// Zeroes one balance and returns what it held.
    pub(super) fn take(&mut self, party: Party) -> u128 {
        let slot = match party {
            Party::Garbler => &mut self.garbler,
            Party::Evaluator => &mut self.evaluator,
        };
        std::mem::take(slot)
    }

    /// Zeroes both balances and returns the joint collateral.
    pub(super) fn drain(&mut self) -> u128 {
        self.take(Party::Garbler) + self.take(Party::Evaluator)
    }
}

/// A balance transfer out of the vault, to be applied by the surrounding
/// ledger once the transition commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payout {
    pub to: Party,
    pub amount: u128,
}

/// Outcome of an adjudicated gate challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisputeOutcome {
    /// The party whose collateral was forfeited.
    pub slashed: Party,
    pub payout: Payout,
}

/// Outcome of settlement: the comparison result plus both refunds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettleOutcome {
    /// `true` means the garbler's value exceeds the evaluator's.
    pub result: bool,
    pub refunds: [Payout; 2],
}

/// One adjudicated session between a garbler and an evaluator.
///
/// All fields are either write-once (commitments, seeds, labels) or mutated
/// solely through the transition methods, which check every guard before
/// touching anything.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde_as(as = "Hex")]
    pub(super) circuit_id: [u8; 32],
    #[serde_as(as = "Hex")]
    pub(super) layout_root: [u8; 32],
    pub(super) deposit: u128,
    pub(super) timeouts: Timeouts,
    pub(super) stage: Stage,
    /// Deadline of the current stage, unix seconds.
    pub(super) deadline: u64,
    pub(super) vault: Vault,
    pub(super) commitments: Option<Vec<InstanceCommitment>>,
    pub(super) chosen: Option<usize>,
    pub(super) opened: Vec<usize>,
    #[serde_as(as = "Vec<Option<Hex>>")]
    pub(super) revealed_seeds: Vec<Option<[u8; 32]>>,
    #[serde_as(as = "Vec<Hex>")]
    pub(super) garbler_labels: Vec<[u8; 32]>,
    pub(super) result: Option<bool>,
}

impl Session {
    /// Opens a session in `Deposits` with the deposit window running.
    pub fn new(
        circuit_id: [u8; 32],
        layout_root: [u8; 32],
        deposit: u128,
        timeouts: Timeouts,
        now: u64,
    ) -> Self {
        let deadline = now + timeouts.window(Stage::Deposits);
        Self {
            circuit_id,
            layout_root,
            deposit,
            timeouts,
            stage: Stage::Deposits,
            deadline,
            vault: Vault::default(),
            commitments: None,
            chosen: None,
            opened: Vec::new(),
            revealed_seeds: vec![None; INSTANCE_COUNT],
            garbler_labels: Vec::new(),
            result: None,
        }
    }

    pub fn circuit_id(&self) -> [u8; 32] {
        self.circuit_id
    }

    pub fn layout_root(&self) -> [u8; 32] {
        self.layout_root
    }

    /// Required collateral per party.
    pub fn deposit_amount(&self) -> u128 {
        self.deposit
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Deadline of the current stage, unix seconds.
    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn commitments(&self) -> Option<&[InstanceCommitment]> {
        self.commitments.as_deref()
    }

    /// The evaluation index `m`, once chosen.
    pub fn chosen(&self) -> Option<usize> {
        self.chosen
    }

    /// Opened instance indices in ascending order; empty before `choose`.
    pub fn opened(&self) -> &[usize] {
        &self.opened
    }

    pub fn revealed_seed(&self, index: usize) -> Option<[u8; 32]> {
        self.revealed_seeds.get(index).copied().flatten()
    }

    pub fn garbler_labels(&self) -> &[[u8; 32]] {
        &self.garbler_labels
    }

    /// The settled comparison result, if the session settled.
    pub fn result(&self) -> Option<bool> {
        self.result
    }
}
