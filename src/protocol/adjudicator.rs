use log::{info, warn};

use crate::commitment::{INSTANCE_COUNT, InstanceCommitment, seed_commitment};
use crate::engine::keccak;

use super::dispute::{GateChallenge, LeafFinding, adjudicate};
use super::errors::ProtocolError;
use super::session::{DisputeOutcome, Party, Payout, Session, SettleOutcome};
use super::stage::Stage;

impl Session {
    /// Locks one party's collateral. The second successful deposit advances
    /// the session to `Commitments`.
    pub fn deposit(&mut self, caller: Party, amount: u128, now: u64) -> Result<(), ProtocolError> {
        self.require_stage("deposit", Stage::Deposits)?;
        self.require_before_deadline(now)?;
        if amount != self.deposit {
            return Err(ProtocolError::WrongDeposit {
                expected: self.deposit,
                got: amount,
            });
        }
        if self.vault.balance(caller) != 0 {
            return Err(ProtocolError::AlreadyDeposited { party: caller });
        }

        self.vault.credit(caller, amount);
        info!("deposit: {caller:?} locked {amount}");

        if self.vault.balance(caller.counterparty()) != 0 {
            self.advance(Stage::Commitments, now);
        }
        Ok(())
    }

    /// Returns the caller's own deposit while the session never started.
    ///
    /// Possible only in `Deposits`: once both parties have paid the stage has
    /// advanced and collateral is locked until a terminal transition.
    pub fn refund(&mut self, caller: Party, _now: u64) -> Result<Payout, ProtocolError> {
        self.require_stage("refund", Stage::Deposits)?;
        if self.vault.balance(caller) == 0 {
            return Err(ProtocolError::NothingToRefund { party: caller });
        }

        let amount = self.vault.take(caller);
        info!("refund: {caller:?} reclaimed {amount}");
        Ok(Payout { to: caller, amount })
    }

    /// Garbler publishes all instance commitments atomically.
    pub fn submit_commitments(
        &mut self,
        caller: Party,
        commitments: Vec<InstanceCommitment>,
        now: u64,
    ) -> Result<(), ProtocolError> {
        self.require_stage("submit_commitments", Stage::Commitments)?;
        require_caller("submit_commitments", caller, Party::Garbler)?;
        self.require_before_deadline(now)?;
        if commitments.len() != INSTANCE_COUNT {
            return Err(ProtocolError::CommitmentCount {
                expected: INSTANCE_COUNT,
                got: commitments.len(),
            });
        }

        self.commitments = Some(commitments);
        self.advance(Stage::Choose, now);
        Ok(())
    }

    /// Evaluator claims both deposits after the garbler failed to commit.
    pub fn abort_phase2(&mut self, caller: Party, now: u64) -> Result<Payout, ProtocolError> {
        self.abort_after_timeout("abort_phase2", Stage::Commitments, Party::Evaluator, caller, now)
    }

    /// Evaluator picks the evaluation instance `m`; every other index forms
    /// the opened set, in ascending order.
    pub fn choose(&mut self, caller: Party, m: usize, now: u64) -> Result<(), ProtocolError> {
        self.require_stage("choose", Stage::Choose)?;
        require_caller("choose", caller, Party::Evaluator)?;
        self.require_before_deadline(now)?;
        if m >= INSTANCE_COUNT {
            return Err(ProtocolError::InstanceOutOfRange {
                index: m,
                limit: INSTANCE_COUNT,
            });
        }

        self.chosen = Some(m);
        self.opened = (0..INSTANCE_COUNT).filter(|index| *index != m).collect();
        info!("choose: m={m}");
        self.advance(Stage::Open, now);
        Ok(())
    }

    /// Garbler claims both deposits after the evaluator failed to choose.
    pub fn abort_phase3(&mut self, caller: Party, now: u64) -> Result<Payout, ProtocolError> {
        self.abort_after_timeout("abort_phase3", Stage::Choose, Party::Garbler, caller, now)
    }

    /// Garbler opens every instance except `m` by revealing its seed; each
    /// seed must hash to the committed `comSeed`.
    pub fn reveal_openings(
        &mut self,
        caller: Party,
        indices: &[usize],
        seeds: &[[u8; 32]],
        now: u64,
    ) -> Result<(), ProtocolError> {
        self.require_stage("reveal_openings", Stage::Open)?;
        require_caller("reveal_openings", caller, Party::Garbler)?;
        self.require_before_deadline(now)?;

        let expected = INSTANCE_COUNT - 1;
        if indices.len() != expected {
            return Err(ProtocolError::OpeningCount {
                expected,
                got: indices.len(),
            });
        }
        if seeds.len() != expected {
            return Err(ProtocolError::OpeningCount {
                expected,
                got: seeds.len(),
            });
        }

        let m = self.chosen.expect("chosen index is set before Open");
        let commitments = self
            .commitments
            .as_ref()
            .expect("commitments are recorded before Open");

        let mut staged = vec![None; INSTANCE_COUNT];
        for (&index, seed) in indices.iter().zip(seeds) {
            if index >= INSTANCE_COUNT {
                return Err(ProtocolError::InstanceOutOfRange {
                    index,
                    limit: INSTANCE_COUNT,
                });
            }
            if index == m {
                return Err(ProtocolError::OpeningContainsChosen { index });
            }
            if staged[index].is_some() {
                return Err(ProtocolError::DuplicateOpening { index });
            }
            if seed_commitment(*seed) != commitments[index].com_seed {
                return Err(ProtocolError::SeedMismatch { index });
            }
            staged[index] = Some(*seed);
        }

        self.revealed_seeds = staged;
        info!("reveal_openings: {} seeds opened", expected);
        self.advance(Stage::Dispute, now);
        Ok(())
    }

    /// Evaluator claims both deposits after the garbler failed to open.
    pub fn abort_phase4(&mut self, caller: Party, now: u64) -> Result<Payout, ProtocolError> {
        self.abort_after_timeout("abort_phase4", Stage::Open, Party::Evaluator, caller, now)
    }

    /// Adjudicates a single-gate fraud claim and closes the session either
    /// way: a proven forgery slashes the garbler, a false challenge on an
    /// honest leaf slashes the evaluator. A challenge whose proofs fail is
    /// rejected with no state change, so the evaluator may retry.
    pub fn challenge_gate_leaf(
        &mut self,
        caller: Party,
        challenge: &GateChallenge,
        now: u64,
    ) -> Result<DisputeOutcome, ProtocolError> {
        self.require_stage("challenge_gate_leaf", Stage::Dispute)?;
        require_caller("challenge_gate_leaf", caller, Party::Evaluator)?;
        self.require_before_deadline(now)?;

        let index = challenge.instance_id;
        if index >= INSTANCE_COUNT {
            return Err(ProtocolError::InstanceOutOfRange {
                index,
                limit: INSTANCE_COUNT,
            });
        }
        if !self.opened.contains(&index) {
            return Err(ProtocolError::InstanceNotOpened { index });
        }
        let seed = self
            .revealed_seed(index)
            .ok_or(ProtocolError::SeedNotRevealed { index })?;
        let root_gc = self
            .commitments
            .as_ref()
            .expect("commitments are recorded before Dispute")[index]
            .root_gc;

        let finding = adjudicate(challenge, self.circuit_id, self.layout_root, root_gc, seed)?;
        let slashed = match finding {
            LeafFinding::Honest => Party::Evaluator,
            LeafFinding::Forged => Party::Garbler,
        };
        let winner = slashed.counterparty();
        let amount = self.vault.drain();
        self.close();

        warn!(
            "challenge_gate_leaf: instance={index} gate={} slashed={slashed:?}",
            challenge.gate_index
        );
        Ok(DisputeOutcome {
            slashed,
            payout: Payout { to: winner, amount },
        })
    }

    /// Leaves the dispute window. The evaluator may advance at any time (an
    /// implicit "satisfied"); the garbler only after the window expires.
    pub fn close_dispute(&mut self, caller: Party, now: u64) -> Result<(), ProtocolError> {
        self.require_stage("close_dispute", Stage::Dispute)?;
        if caller == Party::Garbler {
            self.require_after_deadline(now)?;
        }
        self.advance(Stage::Labels, now);
        Ok(())
    }

    /// Garbler publishes her input-wire labels for the evaluation instance.
    pub fn reveal_garbler_labels(
        &mut self,
        caller: Party,
        labels: Vec<[u8; 32]>,
        now: u64,
    ) -> Result<(), ProtocolError> {
        self.require_stage("reveal_garbler_labels", Stage::Labels)?;
        require_caller("reveal_garbler_labels", caller, Party::Garbler)?;
        self.require_before_deadline(now)?;

        info!("reveal_garbler_labels: {} labels", labels.len());
        self.garbler_labels = labels;
        self.advance(Stage::Settle, now);
        Ok(())
    }

    /// Evaluator claims both deposits after the garbler withheld her labels.
    pub fn abort_phase5(&mut self, caller: Party, now: u64) -> Result<Payout, ProtocolError> {
        self.abort_after_timeout("abort_phase5", Stage::Labels, Party::Evaluator, caller, now)
    }

    /// Evaluator submits the output label; its hash against the committed
    /// anchors decides the result. An unrecognized label reverts without a
    /// slash so the evaluator may retry before the deadline.
    pub fn settle(
        &mut self,
        caller: Party,
        output_label: [u8; 32],
        now: u64,
    ) -> Result<SettleOutcome, ProtocolError> {
        self.require_stage("settle", Stage::Settle)?;
        require_caller("settle", caller, Party::Evaluator)?;
        self.require_before_deadline(now)?;

        let m = self.chosen.expect("chosen index is set before Settle");
        let commitment = &self
            .commitments
            .as_ref()
            .expect("commitments are recorded before Settle")[m];

        let digest = keccak(&[&output_label]);
        let result = if digest == commitment.h0 {
            true
        } else if digest == commitment.h1 {
            false
        } else {
            return Err(ProtocolError::UnknownOutputLabel);
        };

        self.result = Some(result);
        let refunds = [
            Payout {
                to: Party::Garbler,
                amount: self.vault.take(Party::Garbler),
            },
            Payout {
                to: Party::Evaluator,
                amount: self.vault.take(Party::Evaluator),
            },
        ];
        self.close();

        info!("settle: result={result}");
        Ok(SettleOutcome { result, refunds })
    }

    /// Garbler claims both deposits after the evaluator failed to settle.
    pub fn abort_phase6(&mut self, caller: Party, now: u64) -> Result<Payout, ProtocolError> {
        self.abort_after_timeout("abort_phase6", Stage::Settle, Party::Garbler, caller, now)
    }

    fn require_stage(&self, op: &'static str, stage: Stage) -> Result<(), ProtocolError> {
        if self.stage != stage {
            return Err(ProtocolError::WrongStage {
                op,
                stage: self.stage,
            });
        }
        Ok(())
    }

    fn require_before_deadline(&self, now: u64) -> Result<(), ProtocolError> {
        if now > self.deadline {
            return Err(ProtocolError::DeadlineExpired {
                stage: self.stage,
                deadline: self.deadline,
                now,
            });
        }
        Ok(())
    }

    fn require_after_deadline(&self, now: u64) -> Result<(), ProtocolError> {
        if now <= self.deadline {
            return Err(ProtocolError::DeadlinePending {
                stage: self.stage,
                deadline: self.deadline,
                now,
            });
        }
        Ok(())
    }

    /// Shared shape of the per-stage timeout claims: a specific claimant may
    /// drain the joint collateral once the counterparty's window expired.
    fn abort_after_timeout(
        &mut self,
        op: &'static str,
        stage: Stage,
        claimant: Party,
        caller: Party,
        now: u64,
    ) -> Result<Payout, ProtocolError> {
        self.require_stage(op, stage)?;
        require_caller(op, caller, claimant)?;
        self.require_after_deadline(now)?;

        let amount = self.vault.drain();
        self.close();
        warn!("{op}: {claimant:?} claimed {amount} after timeout");
        Ok(Payout {
            to: claimant,
            amount,
        })
    }

    /// Promotes the stage and installs the next deadline in one step.
    fn advance(&mut self, next: Stage, now: u64) {
        info!("stage: {:?} -> {next:?}", self.stage);
        self.stage = next;
        self.deadline = now + self.timeouts.window(next);
    }

    fn close(&mut self) {
        info!("stage: {:?} -> Closed", self.stage);
        self.stage = Stage::Closed;
        self.deadline = 0;
    }
}

fn require_caller(op: &'static str, caller: Party, expected: Party) -> Result<(), ProtocolError> {
    if caller != expected {
        return Err(ProtocolError::Unauthorized { op, caller });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{build_comparator, comparator_output_wire};
    use crate::commitment::{build_instances, commitment_vector, layout_root};
    use crate::protocol::stage::Timeouts;

    const T0: u64 = 1_000;
    const HOUR: u64 = 3_600;

    fn circuit_id() -> [u8; 32] {
        [0x11u8; 32]
    }

    fn master_seed() -> [u8; 32] {
        [0x4du8; 32]
    }

    fn new_session() -> Session {
        let gates = build_comparator(4);
        Session::new(circuit_id(), layout_root(&gates), 1, Timeouts::default(), T0)
    }

    fn commitments() -> Vec<InstanceCommitment> {
        let gates = build_comparator(4);
        let out = comparator_output_wire(&gates, 4).expect("output wire");
        commitment_vector(master_seed(), circuit_id(), &gates, out)
    }

    fn funded_session() -> Session {
        let mut session = new_session();
        session.deposit(Party::Garbler, 1, T0).expect("garbler deposit");
        session.deposit(Party::Evaluator, 1, T0).expect("evaluator deposit");
        session
    }

    fn session_at_open(m: usize) -> Session {
        let mut session = funded_session();
        session
            .submit_commitments(Party::Garbler, commitments(), T0)
            .expect("commitments");
        session.choose(Party::Evaluator, m, T0).expect("choose");
        session
    }

    fn open_seeds(m: usize) -> (Vec<usize>, Vec<[u8; 32]>) {
        let gates = build_comparator(4);
        let instances = build_instances(master_seed(), circuit_id(), &gates);
        let mut indices = Vec::new();
        let mut seeds = Vec::new();
        for artifacts in &instances {
            if artifacts.instance_id != m {
                indices.push(artifacts.instance_id);
                seeds.push(artifacts.seed);
            }
        }
        (indices, seeds)
    }

    fn session_at_dispute(m: usize) -> Session {
        let mut session = session_at_open(m);
        let (indices, seeds) = open_seeds(m);
        session
            .reveal_openings(Party::Garbler, &indices, &seeds, T0)
            .expect("openings");
        session
    }

    #[test]
    fn test_second_deposit_advances_to_commitments() {
        let mut session = new_session();
        session.deposit(Party::Evaluator, 1, T0).expect("first");
        assert_eq!(session.stage(), Stage::Deposits);
        session.deposit(Party::Garbler, 1, T0 + 5).expect("second");
        assert_eq!(session.stage(), Stage::Commitments);
        assert_eq!(session.deadline(), T0 + 5 + HOUR);
        assert_eq!(session.vault().total(), 2);
    }

    #[test]
    fn test_wrong_deposit_amount_rejects() {
        let mut session = new_session();
        let err = session.deposit(Party::Garbler, 2, T0).unwrap_err();
        assert_eq!(err, ProtocolError::WrongDeposit { expected: 1, got: 2 });
        assert_eq!(session.vault().total(), 0);
    }

    #[test]
    fn test_double_deposit_rejects() {
        let mut session = new_session();
        session.deposit(Party::Garbler, 1, T0).expect("first");
        let err = session.deposit(Party::Garbler, 1, T0).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::AlreadyDeposited {
                party: Party::Garbler
            }
        );
    }

    #[test]
    fn test_deposit_after_deadline_rejects() {
        let mut session = new_session();
        let err = session.deposit(Party::Garbler, 1, T0 + HOUR + 1).unwrap_err();
        assert!(matches!(err, ProtocolError::DeadlineExpired { .. }));
    }

    #[test]
    fn test_refund_before_counterparty_deposits() {
        let mut session = new_session();
        session.deposit(Party::Garbler, 1, T0).expect("deposit");
        let payout = session.refund(Party::Garbler, T0 + 10).expect("refund");
        assert_eq!(
            payout,
            Payout {
                to: Party::Garbler,
                amount: 1
            }
        );
        assert_eq!(session.vault().total(), 0);
        assert_eq!(session.stage(), Stage::Deposits);
    }

    #[test]
    fn test_refund_without_balance_rejects() {
        let mut session = new_session();
        let err = session.refund(Party::Evaluator, T0).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::NothingToRefund {
                party: Party::Evaluator
            }
        );
    }

    #[test]
    fn test_refund_after_stage_advanced_rejects() {
        let mut session = funded_session();
        let err = session.refund(Party::Garbler, T0).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::WrongStage {
                op: "refund",
                stage: Stage::Commitments
            }
        );
    }

    #[test]
    fn test_commitments_require_garbler() {
        let mut session = funded_session();
        let err = session
            .submit_commitments(Party::Evaluator, commitments(), T0)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Unauthorized { .. }));
    }

    #[test]
    fn test_commitments_require_full_vector() {
        let mut session = funded_session();
        let mut short = commitments();
        short.pop();
        let err = session
            .submit_commitments(Party::Garbler, short, T0)
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::CommitmentCount {
                expected: INSTANCE_COUNT,
                got: INSTANCE_COUNT - 1
            }
        );
    }

    #[test]
    fn test_choose_out_of_range_rejects() {
        let mut session = funded_session();
        session
            .submit_commitments(Party::Garbler, commitments(), T0)
            .expect("commitments");
        let err = session
            .choose(Party::Evaluator, INSTANCE_COUNT, T0)
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InstanceOutOfRange {
                index: INSTANCE_COUNT,
                limit: INSTANCE_COUNT
            }
        );
    }

    #[test]
    fn test_choose_builds_ordered_open_set() {
        let session = session_at_open(4);
        assert_eq!(session.chosen(), Some(4));
        assert_eq!(session.opened(), &[0, 1, 2, 3, 5, 6, 7, 8, 9]);
        assert_eq!(session.stage(), Stage::Open);
    }

    #[test]
    fn test_openings_reject_wrong_cardinality() {
        let mut session = session_at_open(0);
        let (indices, seeds) = open_seeds(0);
        let err = session
            .reveal_openings(Party::Garbler, &indices[..8], &seeds[..8], T0)
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::OpeningCount {
                expected: INSTANCE_COUNT - 1,
                got: 8
            }
        );
    }

    #[test]
    fn test_openings_reject_the_chosen_index() {
        let mut session = session_at_open(0);
        let (mut indices, seeds) = open_seeds(0);
        indices[0] = 0;
        let err = session
            .reveal_openings(Party::Garbler, &indices, &seeds, T0)
            .unwrap_err();
        assert_eq!(err, ProtocolError::OpeningContainsChosen { index: 0 });
    }

    #[test]
    fn test_openings_reject_a_wrong_seed() {
        let mut session = session_at_open(0);
        let (indices, mut seeds) = open_seeds(0);
        seeds[3][0] ^= 1;
        let err = session
            .reveal_openings(Party::Garbler, &indices, &seeds, T0)
            .unwrap_err();
        assert_eq!(err, ProtocolError::SeedMismatch { index: indices[3] });
        // A failed reveal stages nothing.
        assert!((0..INSTANCE_COUNT).all(|i| session.revealed_seed(i).is_none()));
    }

    #[test]
    fn test_openings_record_every_seed_except_m() {
        let session = session_at_dispute(7);
        for index in 0..INSTANCE_COUNT {
            if index == 7 {
                assert_eq!(session.revealed_seed(index), None);
            } else {
                assert!(session.revealed_seed(index).is_some());
            }
        }
        assert_eq!(session.stage(), Stage::Dispute);
    }

    #[test]
    fn test_evaluator_closes_dispute_at_any_time() {
        let mut session = session_at_dispute(0);
        session
            .close_dispute(Party::Evaluator, T0 + 1)
            .expect("evaluator advances");
        assert_eq!(session.stage(), Stage::Labels);
    }

    #[test]
    fn test_garbler_closes_dispute_only_after_deadline() {
        let mut session = session_at_dispute(0);
        let err = session.close_dispute(Party::Garbler, T0 + 1).unwrap_err();
        assert!(matches!(err, ProtocolError::DeadlinePending { .. }));

        session
            .close_dispute(Party::Garbler, T0 + HOUR + 1)
            .expect("garbler advances after timeout");
        assert_eq!(session.stage(), Stage::Labels);
    }

    #[test]
    fn test_abort_phase2_requires_timeout_and_evaluator() {
        let mut session = funded_session();
        let err = session.abort_phase2(Party::Evaluator, T0 + 10).unwrap_err();
        assert!(matches!(err, ProtocolError::DeadlinePending { .. }));
        let err = session.abort_phase2(Party::Garbler, T0 + HOUR + 1).unwrap_err();
        assert!(matches!(err, ProtocolError::Unauthorized { .. }));

        let payout = session
            .abort_phase2(Party::Evaluator, T0 + HOUR + 1)
            .expect("timeout claim");
        assert_eq!(
            payout,
            Payout {
                to: Party::Evaluator,
                amount: 2
            }
        );
        assert_eq!(session.stage(), Stage::Closed);
        assert_eq!(session.vault().total(), 0);
    }

    #[test]
    fn test_closed_session_rejects_everything() {
        let mut session = funded_session();
        session
            .abort_phase2(Party::Evaluator, T0 + HOUR + 1)
            .expect("close by timeout");
        let err = session.choose(Party::Evaluator, 0, T0).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::WrongStage {
                op: "choose",
                stage: Stage::Closed
            }
        );
    }

    #[test]
    fn test_vault_conservation_through_honest_flow() {
        let mut session = session_at_dispute(3);
        assert_eq!(session.vault().total(), 2);
        session.close_dispute(Party::Evaluator, T0).expect("close");
        session
            .reveal_garbler_labels(Party::Garbler, vec![[0u8; 32]; 4], T0)
            .expect("labels");
        assert_eq!(session.vault().total(), 2);
        assert_eq!(session.stage(), Stage::Settle);
    }

    #[test]
    fn test_settle_rejects_unknown_label_without_slashing() {
        let mut session = session_at_dispute(3);
        session.close_dispute(Party::Evaluator, T0).expect("close");
        session
            .reveal_garbler_labels(Party::Garbler, Vec::new(), T0)
            .expect("labels");

        let err = session.settle(Party::Evaluator, [0xffu8; 32], T0).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownOutputLabel);
        assert_eq!(session.stage(), Stage::Settle);
        assert_eq!(session.vault().total(), 2);
        assert_eq!(session.result(), None);
    }
}
