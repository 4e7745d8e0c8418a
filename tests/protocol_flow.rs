//! End-to-end protocol runs: honest settlements, a caught forgery, a false
//! challenge, timeout claims, and malformed-proof rejections, with wallet
//! accounting checked against the vault at every terminal transition.

use gc_escrow::artifacts::{DisputeInputs, prepare_challenge};
use gc_escrow::circuit::{
    CircuitLayout, build_comparator, comparator_output_wire, evaluate_instance,
    evaluator_label_pairs, garbler_input_labels, not_hints,
};
use gc_escrow::commitment::{
    INSTANCE_COUNT, InstanceArtifacts, build_instances, chain_root, commitment_vector,
    layout_root, result_anchors,
};
use gc_escrow::engine::{Label, keccak};
use gc_escrow::protocol::{Party, Payout, ProtocolError, Session, Stage, Timeouts};

const BIT_WIDTH: usize = 4;
const T0: u64 = 1_000;
const HOUR: u64 = 3_600;
const DEPOSIT: u128 = 1;

/// Both parties' external balances plus the session, with payouts applied
/// the way the surrounding ledger would.
struct Bench {
    session: Session,
    alice: u128,
    bob: u128,
    circuit_id: [u8; 32],
    master_seed: [u8; 32],
}

impl Bench {
    fn new() -> Self {
        let circuit_id = keccak(&[b"protocol-flow-circuit"]);
        let gates = build_comparator(BIT_WIDTH);
        Self {
            session: Session::new(
                circuit_id,
                layout_root(&gates),
                DEPOSIT,
                Timeouts::default(),
                T0,
            ),
            alice: 3,
            bob: 5,
            circuit_id,
            master_seed: keccak(&[b"protocol-flow-master-seed"]),
        }
    }

    fn gates(&self) -> Vec<gc_escrow::engine::GateDesc> {
        build_comparator(BIT_WIDTH)
    }

    fn output_wire(&self) -> u16 {
        comparator_output_wire(&self.gates(), BIT_WIDTH).expect("output wire")
    }

    fn instances(&self) -> Vec<InstanceArtifacts> {
        build_instances(self.master_seed, self.circuit_id, &self.gates())
    }

    fn deposit_both(&mut self, now: u64) {
        self.session
            .deposit(Party::Garbler, DEPOSIT, now)
            .expect("garbler deposit");
        self.alice -= DEPOSIT;
        self.session
            .deposit(Party::Evaluator, DEPOSIT, now)
            .expect("evaluator deposit");
        self.bob -= DEPOSIT;
    }

    fn submit_honest_commitments(&mut self, now: u64) {
        let commitments =
            commitment_vector(self.master_seed, self.circuit_id, &self.gates(), self.output_wire());
        self.session
            .submit_commitments(Party::Garbler, commitments, now)
            .expect("commitments");
    }

    fn reveal_openings(&mut self, m: usize, now: u64) {
        let mut indices = Vec::new();
        let mut seeds = Vec::new();
        for artifacts in self.instances() {
            if artifacts.instance_id != m {
                indices.push(artifacts.instance_id);
                seeds.push(artifacts.seed);
            }
        }
        self.session
            .reveal_openings(Party::Garbler, &indices, &seeds, now)
            .expect("openings");
    }

    fn apply(&mut self, payout: Payout) {
        match payout.to {
            Party::Garbler => self.alice += payout.amount,
            Party::Evaluator => self.bob += payout.amount,
        }
    }

    /// Runs deposit through the end of the dispute window with honest data.
    fn advance_to_labels(&mut self, m: usize) {
        self.deposit_both(T0);
        self.submit_honest_commitments(T0 + 1);
        self.session
            .choose(Party::Evaluator, m, T0 + 2)
            .expect("choose");
        self.reveal_openings(m, T0 + 3);
        self.session
            .close_dispute(Party::Evaluator, T0 + 4)
            .expect("close dispute");
    }

    /// Off-ledger evaluation of instance `m` with honest inputs.
    fn evaluate(&self, m: usize, x: u64, y: u64) -> Label {
        let instances = self.instances();
        let seed = instances[m].seed;
        let layout = CircuitLayout::new(self.circuit_id, m as u64, self.gates());

        let garbler_labels =
            garbler_input_labels(seed, self.circuit_id, m as u64, BIT_WIDTH, x);
        let offers = evaluator_label_pairs(seed, self.circuit_id, m as u64, BIT_WIDTH);
        let evaluator_labels: Vec<Label> = offers
            .iter()
            .enumerate()
            .map(|(idx, (l0, l1))| if (y >> idx) & 1 == 0 { *l0 } else { *l1 })
            .collect();
        let hints = not_hints(seed, &layout);

        evaluate_instance(
            &layout,
            &instances[m].leaves,
            &garbler_labels,
            &evaluator_labels,
            &hints,
            self.output_wire(),
        )
        .expect("evaluation succeeds")
    }

    fn settle_with(&mut self, label: Label, now: u64) -> bool {
        let outcome = self
            .session
            .settle(Party::Evaluator, label.to_bytes32(), now)
            .expect("settle");
        for refund in outcome.refunds {
            self.apply(refund);
        }
        outcome.result
    }
}

fn honest_run(x: u64, y: u64, m: usize) -> (bool, Bench) {
    let mut bench = Bench::new();
    bench.advance_to_labels(m);

    let instances = bench.instances();
    let labels32: Vec<[u8; 32]> =
        garbler_input_labels(instances[m].seed, bench.circuit_id, m as u64, BIT_WIDTH, x)
            .iter()
            .map(Label::to_bytes32)
            .collect();
    bench
        .session
        .reveal_garbler_labels(Party::Garbler, labels32, T0 + 5)
        .expect("labels");

    let output = bench.evaluate(m, x, y);
    let result = bench.settle_with(output, T0 + 6);
    (result, bench)
}

#[test]
fn honest_session_where_the_garbler_wins() {
    let (result, bench) = honest_run(5, 3, 0);
    assert!(result, "x=5 > y=3");
    assert_eq!(bench.session.stage(), Stage::Closed);
    assert_eq!(bench.session.result(), Some(true));
    assert_eq!((bench.alice, bench.bob), (3, 5));
    assert_eq!(bench.session.vault().total(), 0);
}

#[test]
fn honest_session_where_the_evaluator_wins() {
    let (result, bench) = honest_run(2, 9, 7);
    assert!(!result, "x=2 <= y=9");
    assert_eq!(bench.session.result(), Some(false));
    assert_eq!((bench.alice, bench.bob), (3, 5));
}

#[test]
fn equal_inputs_settle_as_not_greater() {
    let (result, _) = honest_run(6, 6, 2);
    assert!(!result, "x=6 is not greater than y=6");
}

#[test]
fn forged_leaf_is_caught_and_the_garbler_is_slashed() {
    let mut bench = Bench::new();
    bench.deposit_both(T0);

    // The garbler tampers one row byte of gate 0 in instance 1 and commits
    // to the tampered circuit.
    let m = 7usize;
    let cheated = 1usize;
    let instances = bench.instances();
    let mut tampered_leaves = instances[cheated].leaves.clone();
    tampered_leaves[0][10] ^= 1;
    let tampered_blocks: Vec<[u8; 32]> = tampered_leaves
        .iter()
        .enumerate()
        .map(|(index, leaf)| gc_escrow::commitment::block_hash(index as u64, leaf))
        .collect();

    let gates = bench.gates();
    let out_wire = bench.output_wire();
    let mut commitments =
        commitment_vector(bench.master_seed, bench.circuit_id, &gates, out_wire);
    commitments[cheated].root_gc = chain_root(&tampered_blocks);

    bench
        .session
        .submit_commitments(Party::Garbler, commitments, T0 + 1)
        .expect("commitments");
    bench
        .session
        .choose(Party::Evaluator, m, T0 + 2)
        .expect("choose");
    bench.reveal_openings(m, T0 + 3);

    // The evaluator audits the delivered leaves against the revealed seed.
    let plan = prepare_challenge(&DisputeInputs {
        bit_width: BIT_WIDTH,
        circuit_id: bench.circuit_id,
        instance_id: cheated as u64,
        seed: bench.session.revealed_seed(cheated).expect("seed revealed"),
        claimed_leaves: tampered_leaves,
        gate_index: None,
        allow_false_challenge: false,
        expected_root_gc: Some(bench.session.commitments().expect("committed")[cheated].root_gc),
    })
    .expect("challenge plan");
    assert_eq!(plan.mismatches, vec![0]);

    let outcome = bench
        .session
        .challenge_gate_leaf(Party::Evaluator, &plan.challenge(), T0 + 4)
        .expect("adjudication");
    assert_eq!(outcome.slashed, Party::Garbler);
    bench.apply(outcome.payout);

    assert_eq!(bench.session.stage(), Stage::Closed);
    assert_eq!((bench.alice, bench.bob), (2, 6));
    assert_eq!(bench.session.vault().total(), 0);
}

#[test]
fn false_challenge_against_an_honest_garbler_slashes_the_evaluator() {
    let mut bench = Bench::new();
    bench.deposit_both(T0);
    bench.submit_honest_commitments(T0 + 1);
    let m = 3usize;
    bench
        .session
        .choose(Party::Evaluator, m, T0 + 2)
        .expect("choose");
    bench.reveal_openings(m, T0 + 3);

    // Valid proofs over an untampered leaf: the adjudicator re-derives the
    // leaf, finds it honest, and slashes the challenger.
    let audited = 0usize;
    let plan = prepare_challenge(&DisputeInputs {
        bit_width: BIT_WIDTH,
        circuit_id: bench.circuit_id,
        instance_id: audited as u64,
        seed: bench.session.revealed_seed(audited).expect("seed revealed"),
        claimed_leaves: bench.instances()[audited].leaves.clone(),
        gate_index: Some(5),
        allow_false_challenge: true,
        expected_root_gc: None,
    })
    .expect("challenge plan");

    let outcome = bench
        .session
        .challenge_gate_leaf(Party::Evaluator, &plan.challenge(), T0 + 4)
        .expect("adjudication");
    assert_eq!(outcome.slashed, Party::Evaluator);
    bench.apply(outcome.payout);

    assert_eq!((bench.alice, bench.bob), (4, 4));
    assert_eq!(bench.session.vault().total(), 0);
}

#[test]
fn commitment_timeout_lets_the_evaluator_claim_everything() {
    let mut bench = Bench::new();
    bench.deposit_both(T0);

    // The garbler never delivers; after the window the evaluator claims.
    let payout = bench
        .session
        .abort_phase2(Party::Evaluator, T0 + HOUR + 1)
        .expect("timeout claim");
    bench.apply(payout);

    assert_eq!(bench.session.stage(), Stage::Closed);
    assert_eq!((bench.alice, bench.bob), (2, 6));
}

#[test]
fn malformed_chain_proof_reverts_and_the_evaluator_retries() {
    let mut bench = Bench::new();
    bench.deposit_both(T0);

    let m = 7usize;
    let cheated = 0usize;
    let instances = bench.instances();
    let mut tampered_leaves = instances[cheated].leaves.clone();
    tampered_leaves[0][10] ^= 1;
    let tampered_blocks: Vec<[u8; 32]> = tampered_leaves
        .iter()
        .enumerate()
        .map(|(index, leaf)| gc_escrow::commitment::block_hash(index as u64, leaf))
        .collect();

    let gates = bench.gates();
    let out_wire = bench.output_wire();
    let mut commitments =
        commitment_vector(bench.master_seed, bench.circuit_id, &gates, out_wire);
    commitments[cheated].root_gc = chain_root(&tampered_blocks);

    bench
        .session
        .submit_commitments(Party::Garbler, commitments, T0 + 1)
        .expect("commitments");
    bench
        .session
        .choose(Party::Evaluator, m, T0 + 2)
        .expect("choose");
    bench.reveal_openings(m, T0 + 3);

    let plan = prepare_challenge(&DisputeInputs {
        bit_width: BIT_WIDTH,
        circuit_id: bench.circuit_id,
        instance_id: cheated as u64,
        seed: bench.session.revealed_seed(cheated).expect("seed revealed"),
        claimed_leaves: tampered_leaves,
        gate_index: None,
        allow_false_challenge: false,
        expected_root_gc: None,
    })
    .expect("challenge plan");

    let mut broken = plan.challenge();
    broken.ih_proof[0][0] ^= 1;
    let err = bench
        .session
        .challenge_gate_leaf(Party::Evaluator, &broken, T0 + 4)
        .unwrap_err();
    assert_eq!(err, ProtocolError::ChainProof);

    // Nothing moved; the session is still in the dispute window.
    assert_eq!(bench.session.stage(), Stage::Dispute);
    assert_eq!(bench.session.vault().total(), 2);

    let outcome = bench
        .session
        .challenge_gate_leaf(Party::Evaluator, &plan.challenge(), T0 + 5)
        .expect("retry with the correct proof");
    assert_eq!(outcome.slashed, Party::Garbler);
    bench.apply(outcome.payout);
    assert_eq!((bench.alice, bench.bob), (2, 6));
}

#[test]
fn settlement_label_matches_the_derived_anchor() {
    // The anchor pair published at commitment time decides the result of an
    // honest evaluation without any further garbler involvement.
    let bench = Bench::new();
    let m = 0usize;
    let instances = bench.instances();
    let layout = CircuitLayout::new(bench.circuit_id, m as u64, bench.gates());
    let (h0, h1) = result_anchors(instances[m].seed, &layout, bench.output_wire());

    let winning = bench.evaluate(m, 9, 4);
    assert_eq!(keccak(&[&winning.to_bytes32()]), h0);
    let losing = bench.evaluate(m, 4, 9);
    assert_eq!(keccak(&[&losing.to_bytes32()]), h1);
}

#[test]
fn out_of_range_choose_is_rejected() {
    let mut bench = Bench::new();
    bench.deposit_both(T0);
    bench.submit_honest_commitments(T0 + 1);
    let err = bench
        .session
        .choose(Party::Evaluator, INSTANCE_COUNT, T0 + 2)
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
fn short_leaf_challenge_is_rejected() {
    let mut bench = Bench::new();
    bench.deposit_both(T0);
    bench.submit_honest_commitments(T0 + 1);
    bench
        .session
        .choose(Party::Evaluator, 9, T0 + 2)
        .expect("choose");
    bench.reveal_openings(9, T0 + 3);

    let plan = prepare_challenge(&DisputeInputs {
        bit_width: BIT_WIDTH,
        circuit_id: bench.circuit_id,
        instance_id: 0,
        seed: bench.session.revealed_seed(0).expect("seed revealed"),
        claimed_leaves: bench.instances()[0].leaves.clone(),
        gate_index: Some(0),
        allow_false_challenge: true,
        expected_root_gc: None,
    })
    .expect("challenge plan");

    let mut truncated = plan.challenge();
    truncated.leaf_bytes.pop();
    let err = bench
        .session
        .challenge_gate_leaf(Party::Evaluator, &truncated, T0 + 4)
        .unwrap_err();
    assert!(matches!(err, ProtocolError::LeafLength { .. }));
    assert_eq!(bench.session.vault().total(), 2);
}
