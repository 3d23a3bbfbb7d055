//! CSV output of a finished session.
//!
//! Layout, column by column (A, B, C):
//!
//! ```text
//! Data Collection Duration (s):,60,
//! Capacitive Sensor Sample rate (Hz):,200,
//! CAPDAC:,0,
//! ,,
//! Sample No.,Timestamp (us),Capacitance (pF)
//! 1,0,6.25
//! 2,100,6.25
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use log::{debug, info};

use crate::errors::Result;
use crate::session::{AcquisitionResult, SessionMetadata};

/// Default folder for data files
pub const DEFAULT_DATA_DIR: &str = "Force Data";

/// Default data file stem
pub const DEFAULT_FILE_STEM: &str = "myFile";

const HEADERS: [&str; 3] = ["Sample No.", "Timestamp (us)", "Capacitance (pF)"];

/// Create `dir` if needed and return `dir/<stem>.csv`.
pub fn data_file_path(dir: impl AsRef<Path>, stem: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        fs::create_dir_all(dir)?;
        debug!("created data folder {}", dir.display());
    }
    Ok(dir.join(format!("{stem}.csv")))
}

/// Write the metadata rows, header row and one row per sample.
pub fn write_csv<W: Write>(writer: W, result: &AcquisitionResult) -> Result<()> {
    let metadata = &result.metadata;
    let mut csv = WriterBuilder::new().flexible(false).from_writer(writer);

    csv.write_record([
        "Data Collection Duration (s):".to_string(),
        format_number(metadata.duration_s),
        String::new(),
    ])?;
    csv.write_record([
        "Capacitive Sensor Sample rate (Hz):".to_string(),
        format_number(metadata.sampling_rate_hz),
        String::new(),
    ])?;
    csv.write_record(["CAPDAC:".to_string(), metadata.capdac.to_string(), String::new()])?;
    csv.write_record(["", "", ""])?;
    csv.write_record(HEADERS)?;

    for (index, sample) in result.samples.iter().enumerate() {
        csv.write_record([
            (index + 1).to_string(),
            sample.relative_timestamp.to_string(),
            format!("{:?}", sample.capacitance_pf),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Write a result to `path`, replacing any existing file.
pub fn save(path: impl AsRef<Path>, result: &AcquisitionResult) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_csv(file, result)?;
    info!("saved {} samples to {}", result.samples.len(), path.display());
    Ok(())
}

/// Whole numbers print without a fractional part, like the configured constants.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
