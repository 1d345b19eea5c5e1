use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::core::types::LearningMode;
use crate::storage::experience_file::{LoadReport, SaveReport};

/// Snapshot of the store's lifecycle state for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub mode: LearningMode,
    pub paused: bool,
    pub read_only: bool,
    pub dirty: bool,

    // Index metrics
    pub positions: usize,
    pub records: usize,
    pub pending: usize,

    pub last_load: Option<DateTime<Utc>>,
    pub last_load_report: Option<LoadReport>,
    pub last_persist: Option<DateTime<Utc>>,
    pub last_persist_report: Option<SaveReport>,
}
