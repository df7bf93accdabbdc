//! JSON summary writer and reader.
//!
//! Writes `TraceSummary` documents to disk with pretty formatting and reads
//! them back for validation.

use crate::aggregator::TraceSummary;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a summary to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `summary` - Summary to write
/// * `output_path` - Path to output JSON file; parent directories are created
///
/// # Errors
/// * `OutputError::Io` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path is empty or a directory
pub fn write_summary(summary: &TraceSummary, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing summary to: {}", output_path.display());

    prepare_output_path(output_path)?;

    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!(
        "Summary written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Serialize a summary to indented JSON text
pub fn summary_to_string(summary: &TraceSummary) -> Result<String, OutputError> {
    Ok(summary.to_json_pretty()?)
}

/// Read a summary from a JSON file
///
/// **Public** - used by the validate command and tests
///
/// # Errors
/// * `OutputError::Io` - File read error
/// * `OutputError::InvalidSummary` - Valid JSON that is not a summary
/// * `OutputError::SerializationFailed` - Malformed JSON
pub fn read_summary(input_path: impl AsRef<Path>) -> Result<TraceSummary, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading summary from: {}", input_path.display());

    let reader = BufReader::new(File::open(input_path)?);
    let summary: TraceSummary = serde_json::from_reader(reader).map_err(|e| {
        if e.is_data() {
            OutputError::InvalidSummary(e.to_string())
        } else {
            OutputError::SerializationFailed(e)
        }
    })?;

    debug!(
        "Summary loaded: {} top-down / {} bottom-up samples",
        summary.top_down_samples(),
        summary.bottom_up_samples()
    );

    Ok(summary)
}

/// Validate an output path and create its parent directories
///
/// **Crate** - shared with the text writer
pub(crate) fn prepare_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}

fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
