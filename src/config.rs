//! Explicit run configuration.
//!
//! Everything the health heuristics compare against (expected class count,
//! expected input size, preprocessing convention) is supplied here, never
//! inferred from the artifact.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::probe::ProbeConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for one validation run. Loadable from a JSON file;
/// command-line flags override individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub artifact_path: PathBuf,
    pub label_path: Option<PathBuf>,
    /// The class count the artifact is supposed to expose. 38 is the
    /// PlantVillage set without the background class; a 39-wide artifact
    /// still carries it.
    pub expected_class_count: usize,
    pub expected_input_height: usize,
    pub expected_input_width: usize,
    pub probe: ProbeConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::new(),
            label_path: None,
            expected_class_count: 38,
            expected_input_height: 224,
            expected_input_width: 224,
            probe: ProbeConfig::default(),
        }
    }
}

impl ValidatorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
