//! Consolidation of per-import state fragments into one state document.

use crate::error::ImportError;
use crate::traits::FileSystem;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// State format version written to the consolidated file
pub const STATE_FORMAT_VERSION: u64 = 4;

/// The state document written at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedState {
    pub version: u64,
    pub terraform_version: String,
    pub serial: u64,
    pub lineage: String,
    pub outputs: Option<Value>,
    pub resources: Vec<Value>,
}

impl ConsolidatedState {
    /// Fresh state: serial 1, empty lineage, no outputs
    pub fn new(terraform_version: &str) -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            terraform_version: terraform_version.to_string(),
            serial: 1,
            lineage: String::new(),
            outputs: None,
            resources: Vec::new(),
        }
    }
}

/// What one fragment adds to the consolidated state.
///
/// Fragments hold at most one resource. An array contributes its first
/// element (nothing when empty); any other value is taken as-is.
pub fn contribution(resources: Value) -> Option<Value> {
    match resources {
        Value::Array(items) => items.into_iter().next(),
        other => Some(other),
    }
}

/// Reads fragments and writes the consolidated state
pub struct StateMerger {
    fs: Arc<dyn FileSystem>,
}

impl StateMerger {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Merge fragments in the given order. Any unreadable fragment aborts the
    /// whole merge.
    pub fn merge(
        &self,
        fragments: &[PathBuf],
        terraform_version: &str,
    ) -> Result<ConsolidatedState, ImportError> {
        let mut state = ConsolidatedState::new(terraform_version);

        for path in fragments {
            if let Some(resource) = self.read_fragment(path)? {
                state.resources.push(resource);
            }
        }

        tracing::debug!(
            fragments = fragments.len(),
            resources = state.resources.len(),
            "fragments merged"
        );
        Ok(state)
    }

    fn read_fragment(&self, path: &Path) -> Result<Option<Value>, ImportError> {
        let content = self.fs.read_to_string(path).map_err(|e| ImportError::Merge {
            path: path.to_path_buf(),
            message: format!("{:#}", e),
        })?;

        let mut document: Value =
            serde_json::from_str(&content).map_err(|e| ImportError::Merge {
                path: path.to_path_buf(),
                message: format!("invalid JSON: {}", e),
            })?;

        let resources = document
            .get_mut("resources")
            .map(Value::take)
            .ok_or_else(|| ImportError::Merge {
                path: path.to_path_buf(),
                message: "no \"resources\" field".to_string(),
            })?;

        Ok(contribution(resources))
    }

    /// Overwrite `path` with the consolidated state
    pub fn write(&self, state: &ConsolidatedState, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(state)
            .map_err(ImportError::from)
            .context("Failed to serialize consolidated state")?;
        json.push('\n');

        self.fs
            .write(path, &json)
            .with_context(|| format!("Failed to write state file: {}", path.display()))
    }
}
