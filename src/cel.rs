//! Parser for the ASCII CEL spike files written by the Xclust sorter.
//!
//! A CEL file is a commented header block followed by a whitespace-delimited
//! data table:
//!
//! ```text
//! % Program: xclust
//! % Cluster: 3
//! % Start time:   0:10:00
//! % End time:     0:20:00
//! % fields: time  pos_x  pos_y
//! %%ENDHEADER
//! 600.1250  12  33
//! 600.3125  13  33
//! ```
//!
//! The header grammar was never documented; the rules below reproduce what
//! the acquisition-era tooling actually accepted.

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::clock::clock_to_seconds;
use crate::filename::task_type_from_name;
use crate::types::{CelFile, NeurolabError};

/// Headers are only searched for within this many leading lines.
const HEADER_SCAN_LINES: usize = 800;
/// Comment marker opening every header line.
const HEADER_MARKER: char = '%';
/// Literal sentinel line closing the header block.
const END_HEADER: &str = "%%ENDHEADER";

fn fields_decl_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^%?\s*fields\s*:").expect("valid fields pattern"))
}

fn digit_run_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digit pattern"))
}

/// Reads and parses a single CEL file from disk.
///
/// Byte content is decoded lossily; the legacy files occasionally carry
/// stray non-UTF-8 bytes in free-text header values.
pub fn load_cel_file<P: AsRef<Path>>(path: P) -> Result<CelFile, NeurolabError> {
    let path = path.as_ref();
    let raw = fs::read(path)?;
    let text = String::from_utf8_lossy(&raw);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_cel(&text, &file_name)
}

/// Parses CEL file content already held in memory.
///
/// `file_name` is the base name of the source file; the task type is
/// derived from its stem.
pub fn parse_cel(text: &str, file_name: &str) -> Result<CelFile, NeurolabError> {
    let lines: Vec<&str> = text.lines().collect();

    let mut fields: Option<Vec<String>> = None;
    let mut header: HashMap<String, String> = HashMap::new();
    let mut end_header_idx: Option<usize> = None;

    for (i, line) in lines.iter().take(HEADER_SCAN_LINES).enumerate() {
        let s = line.trim();

        if s.starts_with(HEADER_MARKER) && s.contains(':') && !fields_decl_pattern().is_match(s) {
            let kv = s.trim_start_matches(HEADER_MARKER).trim();
            if let Some((key, value)) = kv.split_once(':') {
                header.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        if fields_decl_pattern().is_match(s) {
            if let Some((_, rhs)) = s.split_once(':') {
                fields = Some(rhs.split_whitespace().map(str::to_string).collect());
            }
        }

        if s == END_HEADER {
            end_header_idx = Some(i);
            break;
        }
    }

    let fields = fields.ok_or(NeurolabError::MissingFieldsDeclaration)?;
    let end_header_idx =
        end_header_idx.ok_or(NeurolabError::MissingEndHeader(HEADER_SCAN_LINES))?;

    let rows = parse_rows(&lines[end_header_idx + 1..], fields.len());

    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    let cluster = cluster_from_header(header.get("Cluster"));
    let task_type = task_type_from_name(&stem);
    let start_time_sec = clock_to_seconds(header.get("Start time").map_or("", String::as_str));
    let end_time_sec = clock_to_seconds(header.get("End time").map_or("", String::as_str));
    let has_position = fields.iter().any(|f| f == "pos_x") && fields.iter().any(|f| f == "pos_y");

    Ok(CelFile {
        file_name: file_name.to_string(),
        fields,
        header,
        rows,
        cluster,
        task_type,
        start_time_sec,
        end_time_sec,
        has_position,
    })
}

/// Maps each data line positionally onto the field list.
///
/// Rows shorter than the field list leave trailing cells missing; extra
/// tokens are ignored. Rows where no cell coerces to a number are dropped.
fn parse_rows(lines: &[&str], num_fields: usize) -> Vec<Vec<Option<f64>>> {
    let mut rows = Vec::new();
    for line in lines {
        let mut row = vec![None; num_fields];
        let mut any_value = false;
        for (cell, token) in row.iter_mut().zip(line.split_whitespace()) {
            *cell = coerce_numeric(token);
            any_value |= cell.is_some();
        }
        if any_value {
            rows.push(row);
        }
    }
    rows
}

/// Numeric coercion for a single data token.
///
/// A literal `NaN` is treated as missing so that every downstream merge can
/// test presence instead of re-checking for NaN.
fn coerce_numeric(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// First run of digits in the header `Cluster` value.
///
/// A missing key, an empty value, or a value with no digits all mean "no
/// cluster id"; the file still parses.
fn cluster_from_header(raw: Option<&String>) -> Option<i32> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    digit_run_pattern()
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
}
