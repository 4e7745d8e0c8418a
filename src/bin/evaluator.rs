//! Evaluator-side driver. Offline commands evaluate the chosen instance or
//! assemble a dispute packet; transition commands load the shared session
//! store, apply the transition, and persist it back.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use gc_escrow::artifacts::{
    DisputeInputs, decode_hex_array, load_session, parse_hex32_json_list, prepare_challenge,
    read_eval_package, read_hex_lines, save_session,
};
use gc_escrow::circuit::{CircuitLayout, build_comparator, evaluate_instance};
use gc_escrow::engine::{GateDesc, GateKind, Label, keccak};
use gc_escrow::protocol::{GateChallenge, Party, Session};

#[derive(Parser)]
#[command(name = "evaluator", about = "Evaluator (Bob) driver for the fair-exchange comparison")]
struct Cli {
    /// Shared session store both parties transact against.
    #[arg(long, global = true, default_value = "session.json")]
    session: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lock the evaluator collateral.
    Deposit,
    /// Reclaim the deposit while the session never started.
    Refund,
    /// Pick the evaluation instance m; all others get opened for audit.
    Choose {
        #[arg(long)]
        m: usize,
    },
    /// Evaluate the prepared instance under the evaluator's y.
    EvaluateM {
        #[arg(long)]
        eval_dir: PathBuf,
        #[arg(long)]
        y: u64,
    },
    /// Scan claimed leaves against a revealed seed and build a challenge.
    PrepareDispute {
        #[arg(long)]
        instance_id: u64,
        /// Revealed seed for the instance, 32-byte hex.
        #[arg(long)]
        seed: String,
        /// One 71-byte hex leaf per line, as delivered by the garbler.
        #[arg(long)]
        claimed_leaves_file: PathBuf,
        #[arg(long, default_value_t = 8)]
        bit_width: usize,
        #[arg(long)]
        circuit_id: Option<String>,
        /// Challenge this gate instead of the first mismatch.
        #[arg(long)]
        gate_index: Option<usize>,
        /// Cross-check the claimed leaves against this committed root.
        #[arg(long)]
        expected_root_gc: Option<String>,
        /// Build a challenge even for a matching leaf (the adjudicator will
        /// slash the challenger for it).
        #[arg(long)]
        allow_false_challenge: bool,
    },
    /// Submit a single-gate fraud claim to the adjudicator.
    Dispute {
        #[arg(long)]
        instance_id: usize,
        /// Revealed seed for the instance; checked against the session store.
        #[arg(long)]
        seed: String,
        #[arg(long)]
        gate_index: u64,
        /// Gate opcode: 0 AND, 1 XOR, 2 NOT.
        #[arg(long)]
        gate_type: u8,
        #[arg(long)]
        wire_a: u16,
        #[arg(long)]
        wire_b: u16,
        #[arg(long)]
        wire_c: u16,
        /// 71-byte hex leaf as committed.
        #[arg(long)]
        leaf_bytes: String,
        /// JSON array of 32-byte hex values.
        #[arg(long)]
        ih_proof: String,
        /// JSON array of 32-byte hex values.
        #[arg(long)]
        layout_proof: String,
    },
    /// Submit the output label for settlement.
    Settle {
        /// 32-byte hex settlement encoding of the output label.
        #[arg(long)]
        output_label: String,
    },
    /// Declare satisfaction with the openings and leave the dispute window.
    CloseDispute,
    /// Claim both deposits after the garbler failed to commit.
    AbortPhase2,
    /// Claim both deposits after the garbler failed to open.
    AbortPhase4,
    /// Claim both deposits after the garbler withheld her labels.
    AbortPhase5,
    /// Print the session state.
    Status,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Deposit => transact(&cli.session, |session, now| {
            let amount = session.deposit_amount();
            session.deposit(Party::Evaluator, amount, now)?;
            println!("deposited={amount}");
            Ok(())
        }),
        Command::Refund => transact(&cli.session, |session, now| {
            let payout = session.refund(Party::Evaluator, now)?;
            println!("refunded={}", payout.amount);
            Ok(())
        }),
        Command::Choose { m } => transact(&cli.session, |session, now| {
            session.choose(Party::Evaluator, m, now)?;
            println!("chosen={m}");
            println!("opened={:?}", session.opened());
            Ok(())
        }),
        Command::EvaluateM { eval_dir, y } => evaluate_m(&eval_dir, y),
        Command::PrepareDispute {
            instance_id,
            seed,
            claimed_leaves_file,
            bit_width,
            circuit_id,
            gate_index,
            expected_root_gc,
            allow_false_challenge,
        } => prepare_dispute(
            &cli.session,
            instance_id,
            &seed,
            &claimed_leaves_file,
            bit_width,
            circuit_id,
            gate_index,
            expected_root_gc,
            allow_false_challenge,
        ),
        Command::Dispute {
            instance_id,
            seed,
            gate_index,
            gate_type,
            wire_a,
            wire_b,
            wire_c,
            leaf_bytes,
            ih_proof,
            layout_proof,
        } => {
            let kind = GateKind::try_from(gate_type)
                .map_err(|value| anyhow::anyhow!("gate-type must be 0, 1, or 2; got {value}"))?;
            let seed: [u8; 32] = decode_hex_array(&seed)?;
            let challenge = GateChallenge {
                instance_id,
                gate_index,
                gate: GateDesc::new(kind, wire_a, wire_b, wire_c),
                leaf_bytes: decode_hex_array::<71>(&leaf_bytes)?.to_vec(),
                ih_proof: parse_hex32_json_list(&ih_proof)?,
                layout_proof: parse_hex32_json_list(&layout_proof)?,
            };
            transact(&cli.session, move |session, now| {
                match session.revealed_seed(instance_id) {
                    Some(revealed) if revealed == seed => {}
                    Some(_) => bail!("--seed does not match the revealed seed for instance {instance_id}"),
                    None => bail!("no revealed seed for instance {instance_id}"),
                }
                let outcome = session.challenge_gate_leaf(Party::Evaluator, &challenge, now)?;
                println!("slashed={:?}", outcome.slashed);
                println!(
                    "payout to={:?} amount={}",
                    outcome.payout.to, outcome.payout.amount
                );
                Ok(())
            })
        }
        Command::Settle { output_label } => {
            let label: [u8; 32] = decode_hex_array(&output_label)?;
            transact(&cli.session, move |session, now| {
                let outcome = session.settle(Party::Evaluator, label, now)?;
                println!("result={}", outcome.result);
                for refund in outcome.refunds {
                    println!("refund to={:?} amount={}", refund.to, refund.amount);
                }
                Ok(())
            })
        }
        Command::CloseDispute => transact(&cli.session, |session, now| {
            session.close_dispute(Party::Evaluator, now)?;
            println!("dispute_closed=true");
            Ok(())
        }),
        Command::AbortPhase2 => transact(&cli.session, |session, now| {
            let payout = session.abort_phase2(Party::Evaluator, now)?;
            println!("claimed={}", payout.amount);
            Ok(())
        }),
        Command::AbortPhase4 => transact(&cli.session, |session, now| {
            let payout = session.abort_phase4(Party::Evaluator, now)?;
            println!("claimed={}", payout.amount);
            Ok(())
        }),
        Command::AbortPhase5 => transact(&cli.session, |session, now| {
            let payout = session.abort_phase5(Party::Evaluator, now)?;
            println!("claimed={}", payout.amount);
            Ok(())
        }),
        Command::Status => status(&cli.session),
    }
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?
        .as_secs())
}

/// Loads the session, applies one transition, and persists the result only
/// if the transition was accepted.
fn transact(
    path: &Path,
    apply: impl FnOnce(&mut Session, u64) -> Result<()>,
) -> Result<()> {
    let mut session = load_session(path)
        .with_context(|| format!("loading session store {}", path.display()))?;
    apply(&mut session, unix_now()?)?;
    save_session(path, &session)?;
    println!("stage={:?}", session.stage());
    Ok(())
}

fn evaluate_m(eval_dir: &Path, y: u64) -> Result<()> {
    let package = read_eval_package(eval_dir)?;
    let meta = &package.meta;
    if meta.bit_width < 64 && y >= 1u64 << meta.bit_width {
        bail!("y={y} does not fit bit width {}", meta.bit_width);
    }
    if package.garbler_labels.len() != meta.bit_width {
        bail!(
            "payload has {} garbler labels for bit width {}",
            package.garbler_labels.len(),
            meta.bit_width
        );
    }

    let evaluator_labels: Vec<Label> = package
        .offers
        .iter()
        .enumerate()
        .map(|(idx, (l0, l1))| if (y >> idx) & 1 == 0 { *l0 } else { *l1 })
        .collect();

    let layout = CircuitLayout::new(
        meta.circuit_id,
        meta.instance_id,
        build_comparator(meta.bit_width),
    );
    let output = evaluate_instance(
        &layout,
        &package.leaves,
        &package.garbler_labels,
        &evaluator_labels,
        &package.hints,
        meta.output_wire,
    )?;
    let output32 = output.to_bytes32();
    let digest = keccak(&[&output32]);

    println!("instance_id={}", meta.instance_id);
    println!("output_label=0x{}", hex::encode(output32));
    println!("matches_h0={}", digest == meta.h0);
    println!("matches_h1={}", digest == meta.h1);
    if output32 == meta.label_true {
        println!("decoded=x>y");
    } else if output32 == meta.label_false {
        println!("decoded=x<=y");
    } else {
        println!("decoded=unknown");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn prepare_dispute(
    session_path: &Path,
    instance_id: u64,
    seed: &str,
    claimed_leaves_file: &Path,
    bit_width: usize,
    circuit_id: Option<String>,
    gate_index: Option<usize>,
    expected_root_gc: Option<String>,
    allow_false_challenge: bool,
) -> Result<()> {
    let seed: [u8; 32] = decode_hex_array(seed)?;
    let circuit_id: [u8; 32] = match circuit_id {
        Some(raw) => decode_hex_array(&raw)?,
        // Fall back to the session's circuit id when a store is present.
        None => load_session(session_path)
            .map(|session| session.circuit_id())
            .context("no --circuit-id given and no session store to read it from")?,
    };
    let expected_root_gc = expected_root_gc
        .as_deref()
        .map(decode_hex_array::<32>)
        .transpose()?;

    let inputs = DisputeInputs {
        bit_width,
        circuit_id,
        instance_id,
        seed,
        claimed_leaves: read_hex_lines(claimed_leaves_file)?,
        gate_index,
        allow_false_challenge,
        expected_root_gc,
    };
    let plan = prepare_challenge(&inputs)?;

    println!("instance_id={instance_id}");
    println!("gate_index={}", plan.gate_index);
    println!("mismatch_count={}", plan.mismatches.len());
    println!("mismatch_indices={:?}", plan.mismatches);
    println!("gate_type={}", plan.gate.kind as u8);
    println!("wire_a={}", plan.gate.wire_a);
    println!("wire_b={}", plan.gate.wire_b);
    println!("wire_c={}", plan.gate.wire_c);
    println!("claimed_leaf=0x{}", hex::encode(plan.claimed_leaf));
    println!("expected_leaf=0x{}", hex::encode(plan.expected_leaf));
    println!("root_gc=0x{}", hex::encode(plan.root_gc));
    println!("layout_root=0x{}", hex::encode(plan.layout_root));
    println!("ih_proof={}", hex_json_list(&plan.ih_proof));
    println!("layout_proof={}", hex_json_list(&plan.layout_proof));
    Ok(())
}

fn hex_json_list(values: &[[u8; 32]]) -> String {
    let entries: Vec<String> = values
        .iter()
        .map(|value| format!("0x{}", hex::encode(value)))
        .collect();
    serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
}

fn status(path: &Path) -> Result<()> {
    let session = load_session(path)?;
    println!("stage={:?}", session.stage());
    println!("deadline={}", session.deadline());
    println!(
        "vault garbler={} evaluator={}",
        session.vault().balance(Party::Garbler),
        session.vault().balance(Party::Evaluator)
    );
    println!("chosen={:?}", session.chosen());
    println!("result={:?}", session.result());
    Ok(())
}
