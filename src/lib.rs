//! Importer for the legacy Neurolab tetrode recording formats: ASCII CEL
//! spike/position files and fixed-size binary RMA rate-map files, scattered
//! across per-tetrode subdirectories, reconciled into session-level epochs,
//! units, a pooled position trace, and a rate-map table.

mod cel;
mod clock;
mod filename;
pub mod metadata;
mod rma;
mod session;
pub mod types;

use std::path::Path;

pub use cel::{load_cel_file, parse_cel};
pub use clock::clock_to_seconds;
pub use filename::{cell_number_from_name, task_type_from_name};
pub use rma::{load_rma_file, parse_rma};
pub use session::{assemble_session, SessionOptions};
pub use types::*;

/// Loads one subject-session directory and returns the assembled session.
///
/// The directory must follow the tetrode-bank convention: one `TT<n>`
/// subdirectory per tetrode, each holding that bank's CEL and RMA files.
/// For the original dataset layout with separate RAW and ANALYZED roots,
/// use [`assemble_session`] directly.
///
/// # Examples
///
/// ```no_run
/// use neurolab_importer::load_session;
///
/// match load_session("path/to/FD4RAT1") {
///     Ok(session) => println!(
///         "{} epochs, {} units, {} rate maps",
///         session.epochs.len(),
///         session.units.len(),
///         session.rate_maps.len(),
///     ),
///     Err(e) => println!("Error loading session: {}", e),
/// }
/// ```
pub fn load_session<P: AsRef<Path>>(session_dir: P) -> Result<SessionData, NeurolabError> {
    let root = session_dir.as_ref();
    session::assemble_session(root, root, &SessionOptions::default())
}
