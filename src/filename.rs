//! Classification of the legacy 8.3 filenames used by the acquisition
//! system.
//!
//! The task type is encoded as a two-letter filename prefix and per-cell
//! files carry a `CELL~N` tag, e.g. `ESCELL~1.RMA` is the Escher Staircase
//! map of cell 1 while `ES2BC0~1.RMA` is a task-level map.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::TaskType;

fn cell_tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"CELL~(\d+)").expect("valid cell tag pattern"))
}

/// Infers the task type from a filename prefix, case-insensitively.
pub fn task_type_from_name(name: &str) -> TaskType {
    let upper = name.to_ascii_uppercase();
    if upper.starts_with("BL") {
        TaskType::Baseline
    } else if upper.starts_with("ES") {
        TaskType::Escher
    } else if upper.starts_with("MC") {
        TaskType::MagicCarpet
    } else {
        TaskType::Unknown
    }
}

/// Extracts the cell number from a `CELL~N` filename tag, case-insensitively.
///
/// Returns `None` when the tag is absent; a cell number of zero can only
/// come from a literal `CELL~0`.
pub fn cell_number_from_name(name: &str) -> Option<i32> {
    let upper = name.to_ascii_uppercase();
    cell_tag_pattern()
        .captures(&upper)
        .and_then(|caps| caps[1].parse().ok())
}
