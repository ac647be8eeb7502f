//! Parser for the fixed-size binary RMA spatial-map files.
//!
//! An RMA file is exactly 32768 bytes: 4096 big-endian IEEE-754 f32 firing
//! rates followed by 4096 big-endian i32 occupancy counts, each laid out
//! row-major as a 64×64 grid. There is no header, no magic number, and no
//! checksum; the length check is the only structural validation possible.

use byteorder::{BigEndian, ReadBytesExt};
use ndarray::Array2;
use std::fs;
use std::path::Path;

use crate::filename::{cell_number_from_name, task_type_from_name};
use crate::types::{NeurolabError, RmaFile, MAP_DIM, RMA_FILE_SIZE};

const MAP_PIXELS: usize = MAP_DIM * MAP_DIM;

/// Reads and parses a single RMA file from disk.
pub fn load_rma_file<P: AsRef<Path>>(path: P) -> Result<RmaFile, NeurolabError> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_rma(&data, &file_name)
}

/// Parses RMA content already held in memory.
///
/// Fails with [`NeurolabError::UnexpectedBinarySize`] unless `data` is
/// exactly [`RMA_FILE_SIZE`] bytes.
pub fn parse_rma(data: &[u8], file_name: &str) -> Result<RmaFile, NeurolabError> {
    if data.len() != RMA_FILE_SIZE {
        return Err(NeurolabError::UnexpectedBinarySize {
            expected: RMA_FILE_SIZE,
            actual: data.len(),
        });
    }

    let mut rate = vec![0f32; MAP_PIXELS];
    let mut occupancy = vec![0i32; MAP_PIXELS];

    let (mut rate_bytes, mut occupancy_bytes) = data.split_at(MAP_PIXELS * 4);
    rate_bytes.read_f32_into::<BigEndian>(&mut rate)?;
    occupancy_bytes.read_i32_into::<BigEndian>(&mut occupancy)?;

    let rate_map =
        Array2::from_shape_vec((MAP_DIM, MAP_DIM), rate).expect("4096 values fill a 64x64 map");
    let occupancy_map = Array2::from_shape_vec((MAP_DIM, MAP_DIM), occupancy)
        .expect("4096 values fill a 64x64 map");

    Ok(RmaFile {
        file_name: file_name.to_string(),
        rate_map,
        occupancy_map,
        task_type: task_type_from_name(file_name),
        cell_number: cell_number_from_name(file_name),
    })
}
