//! Single-request import and outcome classification.

use super::address::ImportRequest;
use super::ledger::ProgressLedger;
use crate::executor::{Executor, ImportOptions};
use crate::traits::{FileSystem, Output};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cause reported when the address is already tracked in state
pub const ALREADY_MANAGED_CAUSE: &str = "Resource already managed by Terraform";
/// Cause reported when the external id points at nothing
pub const NOT_FOUND_CAUSE: &str = "Cannot import non-existent remote object";

lazy_static! {
    static ref CAUSE_PATTERN: Regex = Regex::new(r"Error: (.*)").expect("Invalid cause pattern regex");
}

/// Result of importing one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// A fragment was written at this path
    Imported(PathBuf),
    AlreadyManaged,
    NotFound,
    Failed(String),
}

impl ImportOutcome {
    /// Whether the address belongs in the ledger
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ImportOutcome::Failed(_))
    }
}

/// Classification of a failed import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    AlreadyManaged,
    NotFound,
    Failed(String),
}

impl From<OutcomeKind> for ImportOutcome {
    fn from(kind: OutcomeKind) -> Self {
        match kind {
            OutcomeKind::AlreadyManaged => ImportOutcome::AlreadyManaged,
            OutcomeKind::NotFound => ImportOutcome::NotFound,
            OutcomeKind::Failed(cause) => ImportOutcome::Failed(cause),
        }
    }
}

/// Map backend error text to an outcome.
///
/// The cause is the rest of the line after the first `Error: `. Without such
/// a line the whole text becomes the failure cause.
pub fn classify(error_text: &str) -> OutcomeKind {
    let Some(cause) = CAUSE_PATTERN
        .captures(error_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end())
    else {
        return OutcomeKind::Failed(error_text.trim().to_string());
    };

    match cause {
        ALREADY_MANAGED_CAUSE => OutcomeKind::AlreadyManaged,
        NOT_FOUND_CAUSE => OutcomeKind::NotFound,
        other => OutcomeKind::Failed(other.to_string()),
    }
}

/// Deterministic fragment location for an address.
///
/// Bytes outside `[A-Za-z0-9._-]` (module paths, `["key"]` indexes) are
/// percent-encoded, `%` included, so the name is a single path component and
/// distinct addresses never share a fragment.
pub fn fragment_path(working_dir: &Path, address: &str) -> PathBuf {
    let mut safe = String::with_capacity(address.len());
    for byte in address.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            safe.push(char::from(byte));
        } else {
            safe.push_str(&format!("%{:02X}", byte));
        }
    }
    working_dir.join(format!("import_{}.state", safe))
}

/// Runs imports against the executor and reports each result
pub struct ImportWorker {
    executor: Arc<dyn Executor>,
    fs: Arc<dyn FileSystem>,
    output: Arc<dyn Output>,
    ledger: Arc<ProgressLedger>,
    working_dir: PathBuf,
    region_env: String,
}

impl ImportWorker {
    pub fn new(
        executor: Arc<dyn Executor>,
        fs: Arc<dyn FileSystem>,
        output: Arc<dyn Output>,
        ledger: Arc<ProgressLedger>,
        working_dir: &Path,
        region_env: &str,
    ) -> Self {
        Self {
            executor,
            fs,
            output,
            ledger,
            working_dir: working_dir.to_path_buf(),
            region_env: region_env.to_string(),
        }
    }

    /// Import one request and classify the result
    pub fn run(&self, request: &ImportRequest) -> ImportOutcome {
        let fragment = fragment_path(&self.working_dir, &request.address);

        // A fragment left by an interrupted run would be read back as state
        if self.fs.exists(&fragment) {
            debug!(path = %fragment.display(), "removing stale fragment");
            if let Err(e) = self.fs.remove_file(&fragment) {
                warn!(path = %fragment.display(), error = %e, "could not remove stale fragment");
            }
        }

        let options = ImportOptions {
            state: fragment.clone(),
            state_out: fragment.clone(),
            lock: false,
            region_env: self.region_env.clone(),
            region: request.context.clone(),
        };

        match self.executor.import(
            &self.working_dir,
            &request.address,
            &request.external_id,
            &options,
        ) {
            Ok(()) => ImportOutcome::Imported(fragment),
            Err(e) => classify(&format!("{:#}", e)).into(),
        }
    }

    /// Import, record terminal outcomes in the ledger, print the status line
    pub fn process(&self, request: &ImportRequest) -> ImportOutcome {
        let outcome = self.run(request);
        debug!(address = %request.address, ?outcome, "import finished");

        if outcome.is_terminal()
            && let Err(e) = self.ledger.record(&request.address)
        {
            warn!(address = %request.address, error = %e, "ledger append failed");
            self.output.warning(&format!(
                "Could not record {} in {}: {:#}",
                request.address,
                self.ledger.path().display(),
                e
            ));
        }

        self.report(request, &outcome);
        outcome
    }

    fn report(&self, request: &ImportRequest, outcome: &ImportOutcome) {
        let line = request.describe();
        match outcome {
            ImportOutcome::Imported(_) => {
                self.output.success(&format!("[+] {} => IMPORTED", line));
            }
            ImportOutcome::AlreadyManaged => self.output.info(&format!(
                "[+] {} => IGNORED | {} already managed by Terraform",
                line, request.address
            )),
            ImportOutcome::NotFound => self.output.info(&format!(
                "[+] {} => IGNORED | {} does not exist",
                line, request.external_id
            )),
            ImportOutcome::Failed(cause) => {
                self.output.error(&format!("[+] {} => FAILED | {}", line, cause));
            }
        }
    }
}
