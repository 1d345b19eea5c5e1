use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use serde::Serialize;
use tracing::info;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::position_index::PositionIndex;
use crate::storage::experience_file::{self, LoadReport};
use crate::storage::file_lock::FileLock;

/// Human-readable outcome of an offline maintenance run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceSummary {
    pub operation: String,
    pub files_read: usize,
    pub records_read: usize,
    pub records_written: usize,
    pub positions: usize,
    pub duplicates_merged: usize,
    pub truncated_bytes: usize,
    pub output: PathBuf,
}

impl MaintenanceSummary {
    fn from_load(operation: &str, files_read: usize, load: &LoadReport, index: &PositionIndex, output: &Path) -> Self {
        MaintenanceSummary {
            operation: operation.to_string(),
            files_read,
            records_read: load.slots,
            records_written: index.len(),
            positions: index.positions(),
            duplicates_merged: load.merged,
            truncated_bytes: load.truncated_bytes,
            output: output.to_path_buf(),
        }
    }
}

impl fmt::Display for MaintenanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: read {} records from {} file(s), wrote {} records for {} positions to {} ({} duplicates merged",
            self.operation,
            self.records_read,
            self.files_read,
            self.records_written,
            self.positions,
            self.output.display(),
            self.duplicates_merged,
        )?;
        if self.truncated_bytes > 0 {
            write!(f, ", {} truncated bytes dropped", self.truncated_bytes)?;
        }
        write!(f, ")")
    }
}

/// Rewrites `path` with every duplicate (key, move) folded into one record.
pub fn defrag(path: &Path) -> Result<MaintenanceSummary> {
    // a missing file must not leave a lock file behind
    fs::metadata(path)?;
    let _lock = FileLock::acquire(path, true)?;

    let (index, report) = experience_file::load(path)?;
    experience_file::save(path, &index)?;

    let summary = MaintenanceSummary::from_load("defrag", 1, &report, &index, path);
    info!(%summary, "defragmented experience file");
    Ok(summary)
}

/// Loads every input into one index and writes it to `output`.
pub fn merge(inputs: &[PathBuf], output: &Path) -> Result<MaintenanceSummary> {
    if inputs.is_empty() {
        return Err(Error::new(ErrorKind::InvalidArgument, "merge needs at least one input file".to_string()));
    }

    for input in inputs {
        fs::metadata(input).map_err(|e| {
            let e = Error::from(e);
            Error::new(e.kind, format!("{}: {}", input.display(), e.context))
        })?;
    }

    let _lock = FileLock::acquire(output, true)?;

    let mut index = PositionIndex::new();
    let mut report = LoadReport::default();
    for input in inputs {
        let file_report = experience_file::load_into(input, &mut index).map_err(|e| {
            Error::new(e.kind, format!("{}: {}", input.display(), e.context))
        })?;
        report.absorb(&file_report);
    }

    experience_file::save(output, &index)?;

    let summary = MaintenanceSummary::from_load("merge", inputs.len(), &report, &index, output);
    info!(%summary, "merged experience files");
    Ok(summary)
}

/// `defrag <file>` with a raw argument list
pub fn defrag_args(args: &[PathBuf]) -> Result<MaintenanceSummary> {
    match args {
        [path] => defrag(path),
        _ => Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("defrag expects exactly one file, got {}", args.len()),
        )),
    }
}

/// `merge <input>... <output>` with a raw argument list; the last path is the output
pub fn merge_args(args: &[PathBuf]) -> Result<MaintenanceSummary> {
    match args {
        [inputs @ .., output] if !inputs.is_empty() => merge(inputs, output),
        _ => Err(Error::new(
            ErrorKind::InvalidArgument,
            "merge expects at least one input and one output file".to_string(),
        )),
    }
}
