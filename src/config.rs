//! Engine configuration

use crate::prp::ApiLookupStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Reconciliation session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Project identifier written into exported reports
    pub project_name: String,

    /// PRP document location; a missing file means "no requirements"
    pub prp_path: PathBuf,

    /// Directory receiving prp-compliance.json and summary.json
    pub output_dir: PathBuf,

    /// Strategy used by API test lookups
    pub api_lookup: ApiLookupStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project_name: "project".to_string(),
            prp_path: PathBuf::from("./prp.json"),
            output_dir: PathBuf::from("./testing/flosho-docs"),
            api_lookup: ApiLookupStrategy::ExactMatch,
        }
    }
}

impl EngineConfig {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Default::default()
        }
    }

    /// Load from a YAML or JSON file. Keys left out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn compliance_path(&self) -> PathBuf {
        self.output_dir.join("prp-compliance.json")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join("summary.json")
    }
}
