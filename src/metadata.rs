//! Session and subject metadata for the Neurolab STS-90 dataset.
//!
//! The Neurolab mission flew April 17 – May 3, 1998. Three rats with
//! hippocampal tetrode implants were recorded preflight on the ground and
//! in-flight on Flight Day 4 and Flight Day 9. Rat 1 and Rat 2 shared one
//! acquisition system on different tetrode banks; Rat 3 was recorded in a
//! separate session.
//!
//! This module realizes the metadata lookup consumed by the downstream
//! container writer: given a subject-session folder name it returns the
//! recording start time and a free-text description. The importer itself
//! never reads this table.

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Publication describing the recordings.
pub const RELATED_PUBLICATION: &str = "doi:10.1038/72910";

/// Experiment-level description shared by every session.
pub const EXPERIMENT_DESCRIPTION: &str = "Hippocampal place cell recordings from rats aboard the Space Shuttle \
     during the Neurolab STS-90 mission (April–May 1998). Three rats with \
     chronically implanted tetrode arrays in hippocampal area CA1 were trained \
     to traverse a three-dimensional track ('Escher staircase') and a flat \
     two-dimensional track ('Magic Carpet') for medial forebrain bundle \
     stimulation reward. Recordings were made preflight on the ground and \
     in-flight on Flight Day 4 and Flight Day 9. Baseline sessions on a \
     rectangular track were interleaved with task sessions.";

/// Institution the recordings were made at.
pub const INSTITUTION: &str = "University of Arizona";
/// Laboratory the recordings were made in.
pub const LAB: &str = "McNaughton Lab";
/// Subject species.
pub const SPECIES: &str = "Rattus norvegicus";
/// Subject strain.
pub const STRAIN: &str = "Fischer 344";
/// Subject sex (all subjects were male).
pub const SEX: &str = "M";

/// Metadata for a single subject-session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    /// Subject folder name, e.g. "FD4RAT1"
    pub subject_folder: &'static str,
    /// Rat identity, e.g. "Rat1"
    pub rat_id: &'static str,
    /// Recording start time
    pub session_date: DateTime<Utc>,
    /// Free-text session description
    pub session_description: &'static str,
}

struct SubjectEntry {
    folder: &'static str,
    rat_id: &'static str,
    // (year, month, day, hour, minute) UTC
    date: (i32, u32, u32, u32, u32),
    description: &'static str,
}

// Session datetimes come from the recording-directory strings in the CEL
// headers of each subject folder.
const SUBJECT_SESSIONS: &[SubjectEntry] = &[
    SubjectEntry {
        folder: "FD4RAT1",
        rat_id: "Rat1",
        date: (1998, 4, 20, 9, 57),
        description: "Flight Day 4 recording — Rat 1. Escher Staircase and Magic Carpet tasks with baseline sessions.",
    },
    SubjectEntry {
        folder: "FD4RAT2",
        rat_id: "Rat2",
        date: (1998, 4, 20, 9, 57),
        description: "Flight Day 4 recording — Rat 2. Recorded simultaneously with Rat 1 on shared acquisition system.",
    },
    SubjectEntry {
        folder: "FD4RAT3",
        rat_id: "Rat3",
        date: (1998, 4, 20, 15, 28),
        description: "Flight Day 4 recording — Rat 3. Separate recording session; partial data recovered due to technical issues.",
    },
    SubjectEntry {
        folder: "FD9RAT1",
        rat_id: "Rat1",
        date: (1998, 4, 25, 12, 45),
        description: "Flight Day 9 recording — Rat 1. Escher Staircase and Magic Carpet tasks with baseline sessions.",
    },
    SubjectEntry {
        folder: "FD9RAT2",
        rat_id: "Rat2",
        date: (1998, 4, 25, 12, 45),
        description: "Flight Day 9 recording — Rat 2. Recorded simultaneously with Rat 1 on shared acquisition system.",
    },
    SubjectEntry {
        folder: "PREFLI~1",
        rat_id: "Rat1",
        date: (1998, 4, 14, 12, 53),
        description: "Preflight ground recording — Rat 1. Recorded 3 days before launch at Kennedy Space Center.",
    },
    SubjectEntry {
        folder: "PREFLI~2",
        rat_id: "Rat2",
        date: (1998, 4, 13, 16, 37),
        description: "Preflight ground recording — Rat 2. Recorded 4 days before launch at Kennedy Space Center.",
    },
    SubjectEntry {
        folder: "PREFLI~3",
        rat_id: "Rat3",
        date: (1998, 4, 14, 13, 49),
        description: "Preflight ground recording — Rat 3. Recorded 3 days before launch at Kennedy Space Center.",
    },
];

/// All known subject-session folder names, in conversion order.
pub fn subjects() -> impl Iterator<Item = &'static str> {
    SUBJECT_SESSIONS.iter().map(|entry| entry.folder)
}

/// Looks up the metadata for a subject-session folder.
pub fn session_metadata(subject_folder: &str) -> Option<SessionMetadata> {
    SUBJECT_SESSIONS
        .iter()
        .find(|entry| entry.folder == subject_folder)
        .map(|entry| {
            let (year, month, day, hour, minute) = entry.date;
            SessionMetadata {
                subject_folder: entry.folder,
                rat_id: entry.rat_id,
                session_date: Utc
                    .with_ymd_and_hms(year, month, day, hour, minute, 0)
                    .single()
                    .expect("valid session date"),
                session_description: entry.description,
            }
        })
}

fn directory_datetime_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"e100-(\d{2})\.(\d{2})\.(\d{2})-(\d{2}):(\d{2})")
            .expect("valid directory datetime pattern")
    })
}

/// Recovers the acquisition datetime from a legacy recording-directory
/// string, e.g. `/data/SHUTTLE/e100-04.20.98-09:57/TT0` → 1998-04-20 09:57.
///
/// Two-digit years above 50 are taken as 19xx, the rest as 20xx.
pub fn session_datetime_from_directory(directory: &str) -> Option<DateTime<Utc>> {
    let caps = directory_datetime_pattern().captures(directory)?;
    let field = |i: usize| caps[i].parse::<u32>().ok();
    let (month, day, year_2d, hour, minute) =
        (field(1)?, field(2)?, field(3)?, field(4)?, field(5)?);
    let year = if year_2d > 50 {
        1900 + year_2d as i32
    } else {
        2000 + year_2d as i32
    };
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
}
