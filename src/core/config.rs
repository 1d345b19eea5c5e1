use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::LearningMode;

pub const OPTION_LEARNING: &str = "Learning";
pub const OPTION_READ_ONLY: &str = "Read only learning";
pub const OPTION_CONCURRENT: &str = "Concurrent Experience";
pub const OPTION_FILE: &str = "Experience File";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub mode: LearningMode,
    pub read_only: bool,
    /// Several engine instances may share `path`; persist must read-merge-write
    pub concurrent: bool,
    pub path: PathBuf,
    pub eval_importance: i32,   // 0..=10, weight of a fresh evaluation in quality
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            mode: LearningMode::Off,
            read_only: false,
            concurrent: false,
            path: PathBuf::from("experience.exp"),
            eval_importance: 5,
        }
    }
}

/// Which part of the configuration an option touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionChange {
    /// Mode or file changed, the store must be initialized again
    Reinitialize,
    Flags,
}

impl StoreConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn enabled(&self) -> bool {
        self.mode.is_enabled()
    }

    /// Applies one option of the host engine's option layer.
    pub fn apply_option(&mut self, name: &str, value: &str) -> Result<OptionChange> {
        match name {
            OPTION_LEARNING => {
                self.mode = LearningMode::parse(value)?;
                Ok(OptionChange::Reinitialize)
            }
            OPTION_FILE => {
                self.path = PathBuf::from(value.trim());
                Ok(OptionChange::Reinitialize)
            }
            OPTION_READ_ONLY => {
                self.read_only = parse_bool(value)?;
                Ok(OptionChange::Flags)
            }
            OPTION_CONCURRENT => {
                self.concurrent = parse_bool(value)?;
                Ok(OptionChange::Flags)
            }
            _ => Err(Error::new(ErrorKind::InvalidArgument, format!("Unknown option '{}'", name))),
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        other => Err(Error::new(ErrorKind::InvalidArgument, format!("Expected a boolean, got '{}'", other))),
    }
}
