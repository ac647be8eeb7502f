use ndarray::Array2;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Side length of the square spatial maps stored in RMA files.
pub const MAP_DIM: usize = 64;

/// Exact byte length of a well-formed RMA file.
///
/// 4096 big-endian f32 rate values followed by 4096 big-endian i32
/// occupancy counts.
pub const RMA_FILE_SIZE: usize = MAP_DIM * MAP_DIM * 4 * 2;

/// Task performed by the animal during a recording epoch.
///
/// Derived from the two-letter prefix of each data file's name. The variant
/// order matches the lexicographic order of the legacy prefix codes, so
/// sorting by `TaskType` reproduces the ordering of the original dataset
/// tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskType {
    /// Rectangular baseline track ("BL" prefix)
    Baseline,
    /// Escher Staircase, a three-dimensional track ("ES" prefix)
    Escher,
    /// Magic Carpet, a flat two-dimensional track ("MC" prefix)
    MagicCarpet,
    /// Filename prefix matched none of the known tasks
    Unknown,
}

impl TaskType {
    /// Two-letter code used in the legacy filenames.
    pub fn code(&self) -> &'static str {
        match self {
            TaskType::Baseline => "BL",
            TaskType::Escher => "ES",
            TaskType::MagicCarpet => "MC",
            TaskType::Unknown => "unknown",
        }
    }

    /// Human-readable description of the task.
    pub fn description(&self) -> &'static str {
        match self {
            TaskType::Baseline => "Baseline — rectangular track",
            TaskType::Escher => {
                "Escher Staircase — three-dimensional track with 90° yaw and pitch turns"
            }
            TaskType::MagicCarpet => "Magic Carpet — flat two-dimensional track",
            TaskType::Unknown => "Unknown task type",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parsed contents of a single CEL spike file.
///
/// CEL files are ASCII tables produced by the Xclust spike sorter: a block
/// of `%`-prefixed header lines, a `fields:` declaration naming the columns,
/// a `%%ENDHEADER` sentinel, then whitespace-delimited data rows. One file
/// holds the spikes of one cluster within one task epoch.
#[derive(Debug, Clone)]
pub struct CelFile {
    /// Base name of the source file (e.g. "ES1CELL~2.CEL")
    pub file_name: String,
    /// Column names from the `fields:` declaration, in declared order
    pub fields: Vec<String>,
    /// Header key/value pairs; the last occurrence of a duplicate key wins
    pub header: HashMap<String, String>,
    /// Data rows, one `Option<f64>` per declared field.
    ///
    /// A cell is `None` when the token failed numeric coercion or the row
    /// was shorter than the field list. Rows with no parseable cell at all
    /// are dropped during parsing.
    pub rows: Vec<Vec<Option<f64>>>,

    // Derived at construction
    /// Cluster id from the header `Cluster` value, if one was present
    pub cluster: Option<i32>,
    /// Task type inferred from the filename prefix
    pub task_type: TaskType,
    /// Epoch start in seconds, `NAN` if the header value was absent or malformed
    pub start_time_sec: f64,
    /// Epoch end in seconds, `NAN` if the header value was absent or malformed
    pub end_time_sec: f64,
    /// Whether both `pos_x` and `pos_y` appear in the field list
    pub has_position: bool,
}

impl CelFile {
    /// Position of `name` in the field list.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// All values of the named column, or `None` if the field was not declared.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.field_index(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Spike times in seconds (the `time` column).
    ///
    /// Unparseable cells are `None`; an empty vector means the file declared
    /// no `time` field.
    pub fn spike_times(&self) -> Vec<Option<f64>> {
        self.column("time").unwrap_or_default()
    }

    /// Position x samples, present only for position-bearing files.
    pub fn pos_x(&self) -> Option<Vec<Option<f64>>> {
        if !self.has_position {
            return None;
        }
        self.column("pos_x")
    }

    /// Position y samples, present only for position-bearing files.
    pub fn pos_y(&self) -> Option<Vec<Option<f64>>> {
        if !self.has_position {
            return None;
        }
        self.column("pos_y")
    }
}

/// Parsed contents of a single RMA binary rate-map file.
#[derive(Debug, Clone)]
pub struct RmaFile {
    /// Base name of the source file (e.g. "MCCELL~3.RMA")
    pub file_name: String,
    /// 64×64 spatial firing rate map (Hz)
    pub rate_map: Array2<f32>,
    /// 64×64 spatial occupancy map (bin visit counts)
    pub occupancy_map: Array2<i32>,
    /// Task type inferred from the filename prefix
    pub task_type: TaskType,
    /// Cell number from a `CELL~N` filename tag; `None` for task-level maps
    pub cell_number: Option<i32>,
}

impl RmaFile {
    /// Whether this map describes a single sorted cell rather than the
    /// whole task epoch.
    pub fn is_cell_map(&self) -> bool {
        self.cell_number.is_some()
    }
}

/// One contiguous task epoch within the recording session.
///
/// Both times are always finite; records with an undefined start or end
/// never enter the epoch set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epoch {
    /// Epoch start in seconds from recording start
    pub start_time_sec: f64,
    /// Epoch end in seconds from recording start
    pub end_time_sec: f64,
    /// Task performed during the epoch
    pub task_type: TaskType,
}

/// One putative neuron, merged across every epoch it was recorded in.
#[derive(Debug, Clone)]
pub struct SessionUnit {
    /// Tetrode bank the unit was recorded on (e.g. "TT0")
    pub tetrode: String,
    /// Cluster id from spike sorting; -1 when no cluster tag was present
    pub cluster_id: i32,
    /// Ascending spike times in seconds; equal timestamps are kept
    pub spike_times: Vec<f64>,
}

/// One sample of the pooled position trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    /// Sample time in seconds
    pub time_sec: f64,
    /// Tracker x coordinate (pixels)
    pub x: f64,
    /// Tracker y coordinate (pixels)
    pub y: f64,
}

/// One row of the session rate-map table, corresponding to one RMA file.
#[derive(Debug, Clone)]
pub struct MapRow {
    /// Tetrode bank the map belongs to
    pub tetrode: String,
    /// Original RMA filename
    pub source_file: String,
    /// Task the map was computed over
    pub task_type: TaskType,
    /// Cell number from a `CELL~N` tag; -1 for task-level maps
    pub cell_number: i32,
    /// 64×64 firing rate map (Hz)
    pub rate_map: Array2<f32>,
    /// 64×64 occupancy map (bin visit counts)
    pub occupancy_map: Array2<i32>,
}

/// A file that failed to parse, with the classified cause.
///
/// Failures are collected per file and never abort the session batch.
#[derive(Debug)]
pub struct ParseFailure {
    /// Path of the offending file
    pub path: PathBuf,
    /// Why it was rejected
    pub error: NeurolabError,
}

/// All session-level entities assembled from one subject-session.
///
/// This is the value handed to the downstream container writer. Every
/// collection is fully materialized and deterministically ordered.
#[derive(Debug)]
pub struct SessionData {
    /// Tetrode bank names in numeric order (e.g. "TT0", "TT1", ...)
    pub tetrodes: Vec<String>,
    /// Task epochs sorted ascending by (start, end, task code)
    pub epochs: Vec<Epoch>,
    /// Merged units ordered by (tetrode, cluster id)
    pub units: Vec<SessionUnit>,
    /// Pooled position trace, `None` when no file carried position columns
    /// or no complete sample survived pooling
    pub position: Option<Vec<PositionSample>>,
    /// One row per parsed RMA file, in discovery order
    pub rate_maps: Vec<MapRow>,
    /// Files that were skipped, with their classified parse errors
    pub failures: Vec<ParseFailure>,
}

/// Error type for the Neurolab importer.
#[derive(Debug, Error)]
pub enum NeurolabError {
    /// The CEL header declared no `fields:` line
    #[error("no fields declaration found in header")]
    MissingFieldsDeclaration,
    /// No `%%ENDHEADER` sentinel within the header scan window
    #[error("no %%ENDHEADER line found in the first {0} lines")]
    MissingEndHeader(usize),
    /// An RMA file was not exactly the fixed map size
    #[error("expected {expected} bytes, got {actual}")]
    UnexpectedBinarySize {
        /// Required RMA file length
        expected: usize,
        /// Observed file length
        actual: usize,
    },
    /// The spike-file root of a session did not exist
    #[error("session directory not found: {0}")]
    SessionRootNotFound(PathBuf),
    /// An I/O error occurred during file reading
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
