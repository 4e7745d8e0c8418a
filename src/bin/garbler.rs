//! Garbler-side driver. Pure derivation commands (anchors, artifacts, the
//! evaluation payload) run offline; transition commands load the shared
//! session store, apply the transition, and persist it back.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::Rng;

use gc_escrow::artifacts::{
    self, EvalMeta, EvalPackage, decode_hex_array, load_session, parse_hex32_json_list,
    read_hex_lines, save_session,
};
use gc_escrow::circuit::{
    CircuitLayout, build_comparator, comparator_output_wire, evaluator_label_pairs,
    garble_instance, garbler_input_labels, not_hints, output_labels,
};
use gc_escrow::commitment::{
    INSTANCE_COUNT, build_instances, commitment_vector, layout_root, result_anchors,
};
use gc_escrow::engine::keccak;
use gc_escrow::protocol::{Party, Session, Timeouts};

#[derive(Parser)]
#[command(name = "garbler", about = "Garbler (Alice) driver for the fair-exchange comparison")]
struct Cli {
    /// Shared session store both parties transact against.
    #[arg(long, global = true, default_value = "session.json")]
    session: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh session store in the Deposits stage.
    Init {
        #[arg(long, default_value_t = 8)]
        bit_width: usize,
        /// 32-byte hex; defaults to a fixed demo identifier.
        #[arg(long)]
        circuit_id: Option<String>,
        #[arg(long, default_value_t = 1)]
        deposit: u128,
        /// Per-stage response window in seconds.
        #[arg(long, default_value_t = 3_600)]
        stage_timeout: u64,
    },
    /// Lock the garbler collateral.
    Deposit,
    /// Reclaim the deposit while the session never started.
    Refund,
    /// Print a fresh random master seed.
    GenMasterSeed,
    /// Print the result anchors (h0/h1) for all instances.
    DeriveAnchors {
        #[arg(long, default_value_t = 8)]
        bit_width: usize,
        #[arg(long)]
        circuit_id: Option<String>,
        #[arg(long)]
        master_seed: Option<String>,
    },
    /// Publish all instance commitments in one transition.
    SubmitCommitments {
        #[arg(long, default_value_t = 8)]
        bit_width: usize,
        #[arg(long)]
        circuit_id: Option<String>,
        #[arg(long)]
        master_seed: Option<String>,
        /// JSON array of 10 hex roots overriding the derived rootGC values.
        #[arg(long)]
        root_gcs: Option<String>,
        /// JSON array of 10 hex anchors overriding the derived h0 values.
        #[arg(long)]
        h0: Option<String>,
        /// JSON array of 10 hex anchors overriding the derived h1 values.
        #[arg(long)]
        h1: Option<String>,
        /// Also write the per-instance audit files here.
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
    /// Write the per-instance audit files (seeds, leaves, roots).
    ExportArtifacts {
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, default_value_t = 8)]
        bit_width: usize,
        #[arg(long)]
        circuit_id: Option<String>,
        #[arg(long)]
        master_seed: Option<String>,
    },
    /// Write the evaluation payload for instance m under the garbler's x.
    PrepareEval {
        #[arg(long)]
        m: usize,
        #[arg(long)]
        x: u64,
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, default_value_t = 8)]
        bit_width: usize,
        #[arg(long)]
        circuit_id: Option<String>,
        #[arg(long)]
        master_seed: Option<String>,
    },
    /// Reveal the seeds of every instance except m.
    RevealOpenings {
        #[arg(long)]
        m: usize,
        #[arg(long, default_value_t = 8)]
        bit_width: usize,
        #[arg(long)]
        circuit_id: Option<String>,
        #[arg(long)]
        master_seed: Option<String>,
    },
    /// Reveal the garbler input labels (32-byte hex, one per line).
    RevealLabels {
        #[arg(long)]
        labels_file: PathBuf,
    },
    /// Advance out of the dispute window once it expired.
    CloseDispute,
    /// Claim both deposits after the evaluator failed to choose.
    AbortPhase3,
    /// Claim both deposits after the evaluator failed to settle.
    AbortPhase6,
    /// Print the session state.
    Status,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Init {
            bit_width,
            circuit_id,
            deposit,
            stage_timeout,
        } => init(&cli.session, bit_width, circuit_id, deposit, stage_timeout),
        Command::Deposit => transact(&cli.session, |session, now| {
            let amount = session.deposit_amount();
            session.deposit(Party::Garbler, amount, now)?;
            println!("deposited={amount}");
            Ok(())
        }),
        Command::Refund => transact(&cli.session, |session, now| {
            let payout = session.refund(Party::Garbler, now)?;
            println!("refunded={}", payout.amount);
            Ok(())
        }),
        Command::GenMasterSeed => {
            let seed: [u8; 32] = rand::rng().random();
            println!("master_seed=0x{}", hex::encode(seed));
            Ok(())
        }
        Command::DeriveAnchors {
            bit_width,
            circuit_id,
            master_seed,
        } => derive_anchors(bit_width, circuit_id, master_seed),
        Command::SubmitCommitments {
            bit_width,
            circuit_id,
            master_seed,
            root_gcs,
            h0,
            h1,
            export_dir,
        } => submit_commitments(
            &cli.session,
            bit_width,
            circuit_id,
            master_seed,
            root_gcs,
            h0,
            h1,
            export_dir,
        ),
        Command::ExportArtifacts {
            out_dir,
            bit_width,
            circuit_id,
            master_seed,
        } => {
            let (circuit_id, master_seed) = identifiers(circuit_id, master_seed)?;
            let gates = build_comparator(bit_width);
            let instances = build_instances(master_seed, circuit_id, &gates);
            artifacts::write_instance_files(&out_dir, &instances)?;
            println!("exported={}", out_dir.display());
            Ok(())
        }
        Command::PrepareEval {
            m,
            x,
            out_dir,
            bit_width,
            circuit_id,
            master_seed,
        } => prepare_eval(m, x, &out_dir, bit_width, circuit_id, master_seed),
        Command::RevealOpenings {
            m,
            bit_width,
            circuit_id,
            master_seed,
        } => reveal_openings(&cli.session, m, bit_width, circuit_id, master_seed),
        Command::RevealLabels { labels_file } => transact(&cli.session, |session, now| {
            let labels = read_hex_lines::<32>(&labels_file)?;
            let count = labels.len();
            session.reveal_garbler_labels(Party::Garbler, labels, now)?;
            println!("labels_revealed={count}");
            Ok(())
        }),
        Command::CloseDispute => transact(&cli.session, |session, now| {
            session.close_dispute(Party::Garbler, now)?;
            println!("dispute_closed=true");
            Ok(())
        }),
        Command::AbortPhase3 => transact(&cli.session, |session, now| {
            let payout = session.abort_phase3(Party::Garbler, now)?;
            println!("claimed={}", payout.amount);
            Ok(())
        }),
        Command::AbortPhase6 => transact(&cli.session, |session, now| {
            let payout = session.abort_phase6(Party::Garbler, now)?;
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

fn default_circuit_id() -> [u8; 32] {
    keccak(&[b"gc-escrow-comparator-v1"])
}

fn default_master_seed() -> [u8; 32] {
    keccak(&[b"gc-escrow-demo-master-seed"])
}

fn identifiers(
    circuit_id: Option<String>,
    master_seed: Option<String>,
) -> Result<([u8; 32], [u8; 32])> {
    let circuit_id = match circuit_id {
        Some(raw) => decode_hex_array(&raw)?,
        None => default_circuit_id(),
    };
    let master_seed = match master_seed {
        Some(raw) => decode_hex_array(&raw)?,
        None => default_master_seed(),
    };
    Ok((circuit_id, master_seed))
}

fn init(
    path: &Path,
    bit_width: usize,
    circuit_id: Option<String>,
    deposit: u128,
    stage_timeout: u64,
) -> Result<()> {
    let (circuit_id, _) = identifiers(circuit_id, None)?;
    let gates = build_comparator(bit_width);
    let session = Session::new(
        circuit_id,
        layout_root(&gates),
        deposit,
        Timeouts::uniform(stage_timeout),
        unix_now()?,
    );
    save_session(path, &session)?;
    println!("session={}", path.display());
    println!("circuit_id=0x{}", hex::encode(circuit_id));
    println!("layout_root=0x{}", hex::encode(session.layout_root()));
    println!("gates={}", gates.len());
    Ok(())
}

fn derive_anchors(
    bit_width: usize,
    circuit_id: Option<String>,
    master_seed: Option<String>,
) -> Result<()> {
    let (circuit_id, master_seed) = identifiers(circuit_id, master_seed)?;
    let gates = build_comparator(bit_width);
    let out_wire = comparator_output_wire(&gates, bit_width)?;

    println!("bit_width={bit_width}");
    println!("circuit_id=0x{}", hex::encode(circuit_id));
    for instance_id in 0..INSTANCE_COUNT {
        let seed =
            gc_escrow::commitment::instance_seed(master_seed, circuit_id, instance_id as u64);
        let layout = CircuitLayout::new(circuit_id, instance_id as u64, gates.clone());
        let (h0, h1) = result_anchors(seed, &layout, out_wire);
        println!(
            "instance={instance_id} h0=0x{} h1=0x{}",
            hex::encode(h0),
            hex::encode(h1)
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn submit_commitments(
    session_path: &Path,
    bit_width: usize,
    circuit_id: Option<String>,
    master_seed: Option<String>,
    root_gcs: Option<String>,
    h0: Option<String>,
    h1: Option<String>,
    export_dir: Option<PathBuf>,
) -> Result<()> {
    let (circuit_id, master_seed) = identifiers(circuit_id, master_seed)?;
    let gates = build_comparator(bit_width);
    let out_wire = comparator_output_wire(&gates, bit_width)?;
    let mut commitments = commitment_vector(master_seed, circuit_id, &gates, out_wire);

    for (flag, values) in [("root-gcs", root_gcs), ("h0", h0), ("h1", h1)] {
        let Some(raw) = values else { continue };
        let parsed = parse_hex32_json_list(&raw)?;
        if parsed.len() != INSTANCE_COUNT {
            bail!("--{flag} must contain {INSTANCE_COUNT} values, got {}", parsed.len());
        }
        for (commitment, value) in commitments.iter_mut().zip(parsed) {
            match flag {
                "root-gcs" => commitment.root_gc = value,
                "h0" => commitment.h0 = value,
                _ => commitment.h1 = value,
            }
        }
    }

    if let Some(dir) = export_dir {
        let instances = build_instances(master_seed, circuit_id, &gates);
        artifacts::write_instance_files(&dir, &instances)?;
        println!("exported={}", dir.display());
    }

    transact(session_path, |session, now| {
        session.submit_commitments(Party::Garbler, commitments, now)?;
        println!("committed={INSTANCE_COUNT}");
        Ok(())
    })
}

fn prepare_eval(
    m: usize,
    x: u64,
    out_dir: &Path,
    bit_width: usize,
    circuit_id: Option<String>,
    master_seed: Option<String>,
) -> Result<()> {
    if m >= INSTANCE_COUNT {
        bail!("m={m} out of range [0, {INSTANCE_COUNT})");
    }
    if bit_width < 64 && x >= 1u64 << bit_width {
        bail!("x={x} does not fit bit width {bit_width}");
    }
    let (circuit_id, master_seed) = identifiers(circuit_id, master_seed)?;

    let gates = build_comparator(bit_width);
    let out_wire = comparator_output_wire(&gates, bit_width)?;
    let seed = gc_escrow::commitment::instance_seed(master_seed, circuit_id, m as u64);
    let layout = CircuitLayout::new(circuit_id, m as u64, gates);
    let (label_false, label_true) = output_labels(seed, &layout, out_wire);

    let package = EvalPackage {
        meta: EvalMeta {
            bit_width,
            circuit_id,
            instance_id: m as u64,
            output_wire: out_wire,
            h0: keccak(&[&label_true.to_bytes32()]),
            h1: keccak(&[&label_false.to_bytes32()]),
            label_true: label_true.to_bytes32(),
            label_false: label_false.to_bytes32(),
        },
        leaves: garble_instance(seed, &layout),
        garbler_labels: garbler_input_labels(seed, circuit_id, m as u64, bit_width, x),
        offers: evaluator_label_pairs(seed, circuit_id, m as u64, bit_width),
        hints: not_hints(seed, &layout),
    };
    artifacts::write_eval_package(out_dir, &package)?;

    println!("eval_dir={}", out_dir.display());
    println!("instance_id={m}");
    println!("output_wire={out_wire}");
    println!("h0=0x{}", hex::encode(package.meta.h0));
    println!("h1=0x{}", hex::encode(package.meta.h1));
    Ok(())
}

fn reveal_openings(
    session_path: &Path,
    m: usize,
    bit_width: usize,
    circuit_id: Option<String>,
    master_seed: Option<String>,
) -> Result<()> {
    if m >= INSTANCE_COUNT {
        bail!("m={m} out of range [0, {INSTANCE_COUNT})");
    }
    let (circuit_id, master_seed) = identifiers(circuit_id, master_seed)?;
    let gates = build_comparator(bit_width);
    let instances = build_instances(master_seed, circuit_id, &gates);

    let mut indices = Vec::with_capacity(INSTANCE_COUNT - 1);
    let mut seeds = Vec::with_capacity(INSTANCE_COUNT - 1);
    for artifacts in &instances {
        if artifacts.instance_id != m {
            indices.push(artifacts.instance_id);
            seeds.push(artifacts.seed);
        }
    }

    transact(session_path, |session, now| {
        session.reveal_openings(Party::Garbler, &indices, &seeds, now)?;
        println!("opened={indices:?}");
        Ok(())
    })
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
