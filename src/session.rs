//! Discovery and reconciliation of one subject-session.
//!
//! A session lives in a directory tree with one subdirectory per tetrode
//! bank (`TT0`, `TT1`, ...), each holding the CEL spike files and RMA map
//! files recorded on that bank. The same recording epoch appears in many
//! per-cluster files, and position samples are physically duplicated onto
//! every cluster's file, so assembling a coherent session is mostly a
//! dedup-and-merge problem:
//!
//! 1. unique (start, end, task) triples become the epoch list;
//! 2. files sharing (tetrode, cluster) merge into one unit with a single
//!    sorted spike train;
//! 3. position triples are pooled across all files and deduplicated to one
//!    sample per timestamp;
//! 4. every parsed map file becomes one row of the rate-map table.
//!
//! A file that fails to parse is logged and skipped; it never aborts the
//! batch.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::cel::load_cel_file;
use crate::rma::load_rma_file;
use crate::types::{
    CelFile, Epoch, MapRow, NeurolabError, ParseFailure, PositionSample, RmaFile, SessionData,
    SessionUnit,
};

/// Recognized spike-file extensions, compared case-insensitively.
const CEL_EXTENSIONS: [&str; 2] = ["CEL", "CELL"];
/// Recognized map-file extension, compared case-insensitively.
const RMA_EXTENSION: &str = "RMA";
/// Tetrode bank directories start with this prefix followed by the bank number.
const TETRODE_PREFIX: &str = "TT";
/// Files of each kind kept per tetrode when stub mode is on.
const STUB_FILES_PER_TETRODE: usize = 2;

/// Options controlling session assembly.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Keep only the first two files of each kind per tetrode, for quick
    /// smoke runs over a large session.
    pub stub: bool,
}

/// Assembles one session from separate spike and map roots.
///
/// The legacy dataset keeps CEL files under a RAW directory and RMA files
/// under an ANALYZED directory, each with its own tetrode subdirectories.
/// `cel_root` must exist; a missing `rma_root` just yields an empty rate-map
/// table. Pass the same path twice when both kinds live in one tree.
pub fn assemble_session<P, Q>(
    cel_root: P,
    rma_root: Q,
    options: &SessionOptions,
) -> Result<SessionData, NeurolabError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let cel_root = cel_root.as_ref();
    let rma_root = rma_root.as_ref();

    if !cel_root.is_dir() {
        return Err(NeurolabError::SessionRootNotFound(cel_root.to_path_buf()));
    }
    let limit = options.stub.then_some(STUB_FILES_PER_TETRODE);

    let cel_banks = tetrode_dirs(cel_root)?;
    let tetrodes: Vec<String> = cel_banks.iter().map(|bank| bank.name.clone()).collect();
    debug!(root = %cel_root.display(), tetrodes = tetrodes.len(), "discovered tetrode banks");

    let mut cel_jobs: Vec<(String, PathBuf)> = Vec::new();
    for bank in &cel_banks {
        for path in files_with_extensions(&bank.path, &CEL_EXTENSIONS, limit)? {
            cel_jobs.push((bank.name.clone(), path));
        }
    }

    let mut rma_jobs: Vec<(String, PathBuf)> = Vec::new();
    if rma_root.is_dir() {
        for bank in tetrode_dirs(rma_root)? {
            for path in files_with_extensions(&bank.path, &[RMA_EXTENSION], limit)? {
                rma_jobs.push((bank.name.clone(), path));
            }
        }
    } else {
        debug!(root = %rma_root.display(), "map root absent, session has no rate maps");
    }

    // Each parse is a pure function of one file's bytes, so the fan-out is
    // free to reorder work; collecting positionally keeps every downstream
    // ordering identical to a serial pass.
    let cel_results: Vec<Result<CelFile, NeurolabError>> = cel_jobs
        .par_iter()
        .map(|(_, path)| load_cel_file(path))
        .collect();
    let rma_results: Vec<Result<RmaFile, NeurolabError>> = rma_jobs
        .par_iter()
        .map(|(_, path)| load_rma_file(path))
        .collect();

    let mut failures: Vec<ParseFailure> = Vec::new();

    let mut cel_files: Vec<(String, CelFile)> = Vec::new();
    for ((tetrode, path), result) in cel_jobs.into_iter().zip(cel_results) {
        match result {
            Ok(cel) => cel_files.push((tetrode, cel)),
            Err(error) => {
                warn!(file = %path.display(), %error, "failed to parse spike file");
                failures.push(ParseFailure { path, error });
            }
        }
    }

    let mut rate_maps: Vec<MapRow> = Vec::new();
    for ((tetrode, path), result) in rma_jobs.into_iter().zip(rma_results) {
        match result {
            Ok(rma) => rate_maps.push(MapRow {
                tetrode,
                source_file: rma.file_name,
                task_type: rma.task_type,
                cell_number: rma.cell_number.unwrap_or(-1),
                rate_map: rma.rate_map,
                occupancy_map: rma.occupancy_map,
            }),
            Err(error) => {
                warn!(file = %path.display(), %error, "failed to parse map file");
                failures.push(ParseFailure { path, error });
            }
        }
    }

    let epochs = merge_epochs(&cel_files);
    let units = merge_units(&cel_files);
    let position = pool_position(&cel_files);

    info!(
        tetrodes = tetrodes.len(),
        epochs = epochs.len(),
        units = units.len(),
        maps = rate_maps.len(),
        failures = failures.len(),
        "session assembled"
    );

    Ok(SessionData {
        tetrodes,
        epochs,
        units,
        position,
        rate_maps,
        failures,
    })
}

struct TetrodeDir {
    name: String,
    number: u32,
    path: PathBuf,
}

/// Tetrode bank subdirectories of `root`, in bank-number order.
fn tetrode_dirs(root: &Path) -> Result<Vec<TetrodeDir>, NeurolabError> {
    let mut banks = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let upper = name.to_ascii_uppercase();
        let Some(suffix) = upper.strip_prefix(TETRODE_PREFIX) else {
            continue;
        };
        match suffix.parse::<u32>() {
            Ok(number) => banks.push(TetrodeDir { name, number, path }),
            Err(_) => {
                warn!(directory = %path.display(), "ignoring tetrode directory without numeric suffix");
            }
        }
    }
    banks.sort_by_key(|bank| bank.number);
    Ok(banks)
}

/// Files under `dir` with one of the given extensions, in filename order.
fn files_with_extensions(
    dir: &Path,
    extensions: &[&str],
    limit: Option<usize>,
) -> Result<Vec<PathBuf>, NeurolabError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_uppercase())
            .is_some_and(|e| extensions.contains(&e.as_str()));
        if matches {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    Ok(files)
}

/// Unique (start, end, task) triples across all spike files.
///
/// Many per-cluster files share one recording epoch; the triple collapses
/// them. Records with an undefined boundary are excluded.
fn merge_epochs(cel_files: &[(String, CelFile)]) -> Vec<Epoch> {
    let mut epochs: Vec<Epoch> = cel_files
        .iter()
        .filter(|(_, cel)| !cel.start_time_sec.is_nan() && !cel.end_time_sec.is_nan())
        .map(|(_, cel)| Epoch {
            start_time_sec: cel.start_time_sec,
            end_time_sec: cel.end_time_sec,
            task_type: cel.task_type,
        })
        .collect();
    epochs.sort_by(|a, b| {
        a.start_time_sec
            .total_cmp(&b.start_time_sec)
            .then(a.end_time_sec.total_cmp(&b.end_time_sec))
            .then(a.task_type.cmp(&b.task_type))
    });
    epochs.dedup();
    epochs
}

/// Merges spike files into units keyed by (tetrode, cluster id).
///
/// Valid spike times are concatenated in file arrival order and sorted
/// ascending; equal timestamps are deliberately kept. A record without a
/// cluster id lands in the -1 bucket. Groups contributing no valid spikes
/// are omitted.
fn merge_units(cel_files: &[(String, CelFile)]) -> Vec<SessionUnit> {
    let mut groups: BTreeMap<(String, i32), Vec<f64>> = BTreeMap::new();
    for (tetrode, cel) in cel_files {
        let valid: Vec<f64> = cel.spike_times().into_iter().flatten().collect();
        if valid.is_empty() {
            continue;
        }
        let cluster_id = cel.cluster.unwrap_or(-1);
        groups
            .entry((tetrode.clone(), cluster_id))
            .or_default()
            .extend(valid);
    }
    groups
        .into_iter()
        .map(|((tetrode, cluster_id), mut spike_times)| {
            spike_times.sort_by(f64::total_cmp);
            SessionUnit {
                tetrode,
                cluster_id,
                spike_times,
            }
        })
        .collect()
}

/// Pools position triples across every position-bearing file.
///
/// The tracker's samples are duplicated onto each cluster's file, so the
/// pooled sequence is sorted by time and collapsed to one sample per
/// distinct timestamp, keeping the first sample in pooling order. That
/// order follows directory traversal, not acquisition; the duplicated
/// coordinates agree in practice, so the choice is observable only for
/// inconsistent inputs.
fn pool_position(cel_files: &[(String, CelFile)]) -> Option<Vec<PositionSample>> {
    if !cel_files.iter().any(|(_, cel)| cel.has_position) {
        return None;
    }

    let mut samples: Vec<PositionSample> = Vec::new();
    for (_, cel) in cel_files {
        if !cel.has_position {
            continue;
        }
        let times = cel.spike_times();
        let (Some(xs), Some(ys)) = (cel.pos_x(), cel.pos_y()) else {
            continue;
        };
        for ((time, x), y) in times.iter().zip(&xs).zip(&ys) {
            if let (Some(time), Some(x), Some(y)) = (time, x, y) {
                samples.push(PositionSample {
                    time_sec: *time,
                    x: *x,
                    y: *y,
                });
            }
        }
    }
    if samples.is_empty() {
        return None;
    }

    // Stable sort: samples with equal times stay in pooling order, so the
    // subsequent dedup keeps the first-pooled one.
    samples.sort_by(|a, b| a.time_sec.total_cmp(&b.time_sec));
    samples.dedup_by(|a, b| a.time_sec == b.time_sec);
    Some(samples)
}
