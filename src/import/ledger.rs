//! Append-only record of resource addresses that no longer need importing.

use crate::error::ImportError;
use crate::traits::FileSystem;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Persistent set of processed addresses.
///
/// The in-memory set is the snapshot taken at startup; [`ProgressLedger::record`]
/// only appends to the file. Appends from concurrent worker-groups are
/// serialized by `write_lock`, held across the whole open-append-close.
pub struct ProgressLedger {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    addresses: HashSet<String>,
    write_lock: Mutex<()>,
}

impl ProgressLedger {
    /// Open the ledger at `path`, creating an empty one if absent
    pub fn load(fs: Arc<dyn FileSystem>, path: &Path) -> Result<Self> {
        fs.touch(path).map_err(|e| {
            ImportError::Setup(format!(
                "cannot create ledger {}: {:#}",
                path.display(),
                e
            ))
        })?;

        let reader = fs.open_read(path).map_err(|e| {
            ImportError::Setup(format!("cannot read ledger {}: {:#}", path.display(), e))
        })?;

        let mut addresses = HashSet::new();
        for line in reader.lines() {
            let line = line
                .map_err(ImportError::from)
                .with_context(|| format!("Failed to read ledger: {}", path.display()))?;
            let address = line.trim_end();
            if !address.is_empty() {
                addresses.insert(address.to_string());
            }
        }

        tracing::debug!(path = %path.display(), entries = addresses.len(), "ledger loaded");

        Ok(Self {
            fs,
            path: path.to_path_buf(),
            addresses,
            write_lock: Mutex::new(()),
        })
    }

    /// Whether `address` was already processed when the ledger was loaded
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append one address
    pub fn record(&self, address: &str) -> Result<()> {
        let line = format!("{}\n", address.trim());

        // A poisoned lock only means another writer panicked mid-append; the
        // file itself is still append-only.
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.fs
            .append(&self.path, &line)
            .with_context(|| format!("Failed to record {} in ledger", address.trim()))
    }
}
