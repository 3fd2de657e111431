use anyhow::Result;
use std::path::{Path, PathBuf};

/// Per-call options for a backend import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    /// State the backend reads before importing.
    ///
    /// The worker points this at the request's own fragment and removes any
    /// leftover first, so the local file never already tracks the address.
    /// An "already managed" answer can only come from state the backend holds
    /// elsewhere (a configured remote backend, for instance).
    pub state: PathBuf,
    /// Where the backend writes the resulting state fragment
    pub state_out: PathBuf,
    /// Whether the backend may take a state lock
    pub lock: bool,
    /// Environment variable carrying the target region
    pub region_env: String,
    /// Region value for this request
    pub region: String,
}

/// Trait for the provisioning tool that performs the actual imports
/// (Terraform, OpenTofu, or a test double).
///
/// An `Err` from [`Executor::import`] carries the tool's error text; the
/// caller classifies it.
pub trait Executor: Send + Sync {
    /// Check if the executor is installed and available
    fn check_installed(&self, working_dir: &Path) -> Result<bool>;

    /// One-time bootstrap of the working directory (`terraform init`)
    fn init(&self, working_dir: &Path) -> Result<()>;

    /// Import one existing object under `address`
    fn import(
        &self,
        working_dir: &Path,
        address: &str,
        external_id: &str,
        options: &ImportOptions,
    ) -> Result<()>;

    /// Get the name of this executor (e.g., "terraform", "opentofu")
    fn get_name(&self) -> &str;
}

#[cfg(test)]
pub use mock::{MockExecutor, MockImport};
