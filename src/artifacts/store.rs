use std::fs;
use std::path::Path;

use crate::circuit::NotHint;
use crate::commitment::InstanceArtifacts;
use crate::engine::{LEAF_LEN, Label};
use crate::protocol::Session;

use super::ArtifactError;

/// Decodes a hex string (optional `0x` prefix) into a fixed-size array.
pub fn decode_hex_array<const N: usize>(value: &str) -> Result<[u8; N], ArtifactError> {
    let trimmed = value.trim();
    let raw = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(raw).map_err(|err| ArtifactError::BadHex {
        value: value.to_string(),
        reason: err.to_string(),
    })?;
    <[u8; N]>::try_from(bytes).map_err(|bytes: Vec<u8>| ArtifactError::BadHex {
        value: value.to_string(),
        reason: format!("expected {N} bytes, got {}", bytes.len()),
    })
}

/// Parses a JSON array of hex strings into 32-byte values, the format of the
/// list-valued CLI flags.
pub fn parse_hex32_json_list(raw: &str) -> Result<Vec<[u8; 32]>, ArtifactError> {
    let entries: Vec<String> = serde_json::from_str(raw)?;
    entries.iter().map(|entry| decode_hex_array(entry)).collect()
}

fn hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Data lines of an artifact file: comment-stripped, trimmed of the wrapper
/// punctuation accepted on input (trailing commas, brackets, quotes).
fn data_lines(raw: &str) -> impl Iterator<Item = (usize, &str)> {
    raw.lines().enumerate().filter_map(|(idx, line)| {
        let value = line
            .split('#')
            .next()
            .unwrap_or("")
            .trim()
            .trim_end_matches(',')
            .trim_matches('"')
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim();
        if value.is_empty() {
            None
        } else {
            Some((idx + 1, value))
        }
    })
}

/// Reads a file of one fixed-size hex value per line.
pub fn read_hex_lines<const N: usize>(path: &Path) -> Result<Vec<[u8; N]>, ArtifactError> {
    let raw = fs::read_to_string(path)?;
    let mut out = Vec::new();
    for (line, value) in data_lines(&raw) {
        let parsed = decode_hex_array(value).map_err(|err| ArtifactError::BadLine {
            path: path.display().to_string(),
            line,
            reason: err.to_string(),
        })?;
        out.push(parsed);
    }
    if out.is_empty() {
        return Err(ArtifactError::EmptyFile {
            path: path.display().to_string(),
        });
    }
    Ok(out)
}

/// Writes the per-instance audit files the evaluator inspects during a
/// dispute: seed, seed commitment, circuit root, and all leaves.
pub fn write_instance_files(
    dir: &Path,
    instances: &[InstanceArtifacts],
) -> Result<(), ArtifactError> {
    fs::create_dir_all(dir)?;

    let mut manifest = String::from("# per-instance garbling artifacts\n");
    for artifacts in instances {
        let id = artifacts.instance_id;
        fs::write(
            dir.join(format!("instance-{id}-seed.txt")),
            format!("{}\n", hex_prefixed(&artifacts.seed)),
        )?;
        fs::write(
            dir.join(format!("instance-{id}-com-seed.txt")),
            format!("{}\n", hex_prefixed(&artifacts.com_seed)),
        )?;
        fs::write(
            dir.join(format!("instance-{id}-root-gc.txt")),
            format!("{}\n", hex_prefixed(&artifacts.root_gc)),
        )?;

        let mut leaves = String::new();
        for leaf in &artifacts.leaves {
            leaves.push_str(&hex_prefixed(leaf));
            leaves.push('\n');
        }
        fs::write(dir.join(format!("instance-{id}-leaves.txt")), leaves)?;

        manifest.push_str(&format!(
            "instance {id}: root_gc={}\n",
            hex_prefixed(&artifacts.root_gc)
        ));
    }
    fs::write(dir.join("manifest.txt"), manifest)?;
    Ok(())
}

/// Header of an evaluation payload directory, `key=value` per line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalMeta {
    pub bit_width: usize,
    pub circuit_id: [u8; 32],
    pub instance_id: u64,
    pub output_wire: u16,
    pub h0: [u8; 32],
    pub h1: [u8; 32],
    /// 32-byte settlement encoding of the semantic-true output label.
    pub label_true: [u8; 32],
    pub label_false: [u8; 32],
}

/// Everything the evaluator needs to run the chosen instance offline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalPackage {
    pub meta: EvalMeta,
    pub leaves: Vec<[u8; LEAF_LEN]>,
    pub garbler_labels: Vec<Label>,
    /// `(label0, label1)` per evaluator input wire, lowest wire first.
    pub offers: Vec<(Label, Label)>,
    pub hints: Vec<NotHint>,
}

const META_FILE: &str = "eval-meta.txt";
const LEAVES_FILE: &str = "instance-m-leaves.txt";
const GARBLER_LABELS_FILE: &str = "garbler-input-labels.txt";
const GARBLER_LABELS32_FILE: &str = "garbler-input-labels32.txt";
const OFFERS_FILE: &str = "evaluator-label-offers.txt";
const HINTS_FILE: &str = "not-hints.txt";

/// Writes an evaluation payload directory.
///
/// Besides the 16-byte working labels this also writes the garbler labels in
/// their 32-byte settlement encoding, ready for the on-ledger reveal.
pub fn write_eval_package(dir: &Path, package: &EvalPackage) -> Result<(), ArtifactError> {
    fs::create_dir_all(dir)?;

    let meta = &package.meta;
    fs::write(
        dir.join(META_FILE),
        format!(
            "bit_width={}\ncircuit_id={}\ninstance_id={}\noutput_wire={}\nh0={}\nh1={}\nlabel_true={}\nlabel_false={}\n",
            meta.bit_width,
            hex_prefixed(&meta.circuit_id),
            meta.instance_id,
            meta.output_wire,
            hex_prefixed(&meta.h0),
            hex_prefixed(&meta.h1),
            hex_prefixed(&meta.label_true),
            hex_prefixed(&meta.label_false),
        ),
    )?;

    let mut leaves = String::new();
    for leaf in &package.leaves {
        leaves.push_str(&hex_prefixed(leaf));
        leaves.push('\n');
    }
    fs::write(dir.join(LEAVES_FILE), leaves)?;

    let mut labels16 = String::new();
    let mut labels32 = String::new();
    for label in &package.garbler_labels {
        labels16.push_str(&label.to_hex());
        labels16.push('\n');
        labels32.push_str(&hex_prefixed(&label.to_bytes32()));
        labels32.push('\n');
    }
    fs::write(dir.join(GARBLER_LABELS_FILE), labels16)?;
    fs::write(dir.join(GARBLER_LABELS32_FILE), labels32)?;

    let mut offers = String::new();
    for (idx, (l0, l1)) in package.offers.iter().enumerate() {
        let wire = meta.bit_width + idx;
        offers.push_str(&format!("{wire},{},{}\n", l0.to_hex(), l1.to_hex()));
    }
    fs::write(dir.join(OFFERS_FILE), offers)?;

    let mut hints = String::new();
    for hint in &package.hints {
        hints.push_str(&format!(
            "{},{},{},{},{}\n",
            hint.gate_index,
            hint.input0.to_hex(),
            hint.output0.to_hex(),
            hint.input1.to_hex(),
            hint.output1.to_hex(),
        ));
    }
    fs::write(dir.join(HINTS_FILE), hints)?;
    Ok(())
}

/// Reads an evaluation payload directory back.
pub fn read_eval_package(dir: &Path) -> Result<EvalPackage, ArtifactError> {
    let meta = read_eval_meta(&dir.join(META_FILE))?;
    let leaves = read_hex_lines::<LEAF_LEN>(&dir.join(LEAVES_FILE))?;
    let garbler_labels = read_hex_lines::<16>(&dir.join(GARBLER_LABELS_FILE))?
        .into_iter()
        .map(Label)
        .collect();
    let offers = read_offer_rows(&dir.join(OFFERS_FILE), meta.bit_width)?;
    let hints = read_hint_rows(&dir.join(HINTS_FILE))?;

    Ok(EvalPackage {
        meta,
        leaves,
        garbler_labels,
        offers,
        hints,
    })
}

fn read_eval_meta(path: &Path) -> Result<EvalMeta, ArtifactError> {
    let raw = fs::read_to_string(path)?;
    let entries: Vec<(usize, &str, &str)> = data_lines(&raw)
        .filter_map(|(line, value)| {
            value
                .split_once('=')
                .map(|(k, v)| (line, k.trim(), v.trim()))
        })
        .collect();

    let lookup = |key: &str| -> Result<&str, ArtifactError> {
        entries
            .iter()
            .find(|(_, k, _)| *k == key)
            .map(|(_, _, v)| *v)
            .ok_or_else(|| ArtifactError::MissingKey {
                path: path.display().to_string(),
                key: key.to_string(),
            })
    };
    let parse_int = |key: &str| -> Result<u64, ArtifactError> {
        let value = lookup(key)?;
        value.parse::<u64>().map_err(|err| ArtifactError::BadLine {
            path: path.display().to_string(),
            line: 0,
            reason: format!("{key}={value}: {err}"),
        })
    };

    Ok(EvalMeta {
        bit_width: parse_int("bit_width")? as usize,
        circuit_id: decode_hex_array(lookup("circuit_id")?)?,
        instance_id: parse_int("instance_id")?,
        output_wire: parse_int("output_wire")? as u16,
        h0: decode_hex_array(lookup("h0")?)?,
        h1: decode_hex_array(lookup("h1")?)?,
        label_true: decode_hex_array(lookup("label_true")?)?,
        label_false: decode_hex_array(lookup("label_false")?)?,
    })
}

fn read_offer_rows(path: &Path, bit_width: usize) -> Result<Vec<(Label, Label)>, ArtifactError> {
    let raw = fs::read_to_string(path)?;
    let mut slots = vec![None; bit_width];

    for (line, value) in data_lines(&raw) {
        let bad = |reason: String| ArtifactError::BadLine {
            path: path.display().to_string(),
            line,
            reason,
        };
        let fields: Vec<&str> = value.split(',').map(str::trim).collect();
        let [wire, l0, l1] = fields[..] else {
            return Err(bad("expected wire,label0,label1".to_string()));
        };
        let wire: usize = wire.parse().map_err(|err| bad(format!("wire: {err}")))?;
        if wire < bit_width || wire >= 2 * bit_width {
            return Err(bad(format!(
                "wire {wire} outside evaluator range [{bit_width}, {})",
                2 * bit_width
            )));
        }
        slots[wire - bit_width] = Some((
            Label(decode_hex_array(l0).map_err(|err| bad(err.to_string()))?),
            Label(decode_hex_array(l1).map_err(|err| bad(err.to_string()))?),
        ));
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.ok_or_else(|| ArtifactError::EmptyFile {
                path: format!("{} (missing wire {})", path.display(), idx),
            })
        })
        .collect()
}

fn read_hint_rows(path: &Path) -> Result<Vec<NotHint>, ArtifactError> {
    let raw = fs::read_to_string(path)?;
    let mut out = Vec::new();

    for (line, value) in data_lines(&raw) {
        let bad = |reason: String| ArtifactError::BadLine {
            path: path.display().to_string(),
            line,
            reason,
        };
        let fields: Vec<&str> = value.split(',').map(str::trim).collect();
        let [gate, in0, out0, in1, out1] = fields[..] else {
            return Err(bad("expected gate,in0,out0,in1,out1".to_string()));
        };
        out.push(NotHint {
            gate_index: gate.parse().map_err(|err| bad(format!("gate: {err}")))?,
            input0: Label(decode_hex_array(in0).map_err(|err| bad(err.to_string()))?),
            output0: Label(decode_hex_array(out0).map_err(|err| bad(err.to_string()))?),
            input1: Label(decode_hex_array(in1).map_err(|err| bad(err.to_string()))?),
            output1: Label(decode_hex_array(out1).map_err(|err| bad(err.to_string()))?),
        });
    }

    Ok(out)
}

/// Loads the shared session store both party binaries transact against.
pub fn load_session(path: &Path) -> Result<Session, ArtifactError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Persists the session store after an accepted transition.
pub fn save_session(path: &Path, session: &Session) -> Result<(), ArtifactError> {
    let raw = serde_json::to_string_pretty(session)?;
    fs::write(path, raw)?;
    Ok(())
}
