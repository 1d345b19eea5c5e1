use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use memmap2::Mmap;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use crate::core::error::Result;
use crate::index::position_index::{InsertOutcome, PositionIndex};
use crate::storage::record::{decode_slot, Format, RECORD_SIZE};

/// What a load found in one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub slots: usize,
    pub v1_slots: usize,
    pub v2_slots: usize,
    /// Slots folded into an already indexed (key, move)
    pub merged: usize,
    /// Trailing bytes that did not form a whole slot
    pub truncated_bytes: usize,
}

impl LoadReport {
    pub fn absorb(&mut self, other: &LoadReport) {
        self.slots += other.slots;
        self.v1_slots += other.v1_slots;
        self.v2_slots += other.v2_slots;
        self.merged += other.merged;
        self.truncated_bytes += other.truncated_bytes;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub records: usize,
    pub positions: usize,
    pub bytes: u64,
}

pub fn load(path: &Path) -> Result<(PositionIndex, LoadReport)> {
    let mut index = PositionIndex::new();
    let report = load_into(path, &mut index)?;
    Ok((index, report))
}

/// Decodes every whole slot of `path` into `index`, merging duplicates as they
/// arrive. A partial trailing slot is dropped.
pub fn load_into(path: &Path, index: &mut PositionIndex) -> Result<LoadReport> {
    let file = File::open(path)?;
    let len = file.metadata()?.len() as usize;

    let mut report = LoadReport::default();
    if len == 0 {
        return Ok(report);
    }

    // Readers and writers of a shared file coordinate through FileLock;
    // saves replace the file by rename, so this mapping is never truncated.
    let mmap = unsafe { Mmap::map(&file)? };

    let slots = mmap.chunks_exact(RECORD_SIZE);
    report.truncated_bytes = slots.remainder().len();
    index.reserve(len / RECORD_SIZE);

    for chunk in slots {
        let Ok(slot) = <&[u8; RECORD_SIZE]>::try_from(chunk) else {
            continue;
        };
        let decoded = decode_slot(slot);

        report.slots += 1;
        match decoded.format {
            Format::V1 => report.v1_slots += 1,
            Format::V2 => report.v2_slots += 1,
        }
        if index.insert(decoded.record) == InsertOutcome::Merged {
            report.merged += 1;
        }
    }

    if report.truncated_bytes > 0 {
        warn!(
            path = %path.display(),
            bytes = report.truncated_bytes,
            "ignoring truncated trailing slot"
        );
    }
    debug!(path = %path.display(), slots = report.slots, merged = report.merged, "loaded experience file");

    Ok(report)
}

/// Writes the whole index in the current format. The target is replaced
/// atomically, so readers see either the old or the new file.
pub fn save(path: &Path, index: &PositionIndex) -> Result<SaveReport> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::with_capacity(64 * 1024, &mut tmp);
        for record in index.iter() {
            writer.write_all(&record.to_bytes(Format::CURRENT))?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    let report = SaveReport {
        records: index.len(),
        positions: index.positions(),
        bytes: (index.len() * RECORD_SIZE) as u64,
    };
    debug!(path = %path.display(), records = report.records, "saved experience file");

    Ok(report)
}
