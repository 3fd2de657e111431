use super::address::{AddressSource, ImportRequest};
use super::ledger::ProgressLedger;
use super::merger::StateMerger;
use super::scheduler::{BatchReport, BatchScheduler};
use super::worker::ImportWorker;
use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::executor::Executor;
use crate::traits::{FileSystem, Output};
use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Counts and artifacts of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lines skipped because the ledger already had them
    pub skipped: usize,
    /// Requests handed to the scheduler
    pub scheduled: usize,
    pub imported: usize,
    pub already_managed: usize,
    pub not_found: usize,
    pub failed: usize,
    /// Consolidated state file, when one was written
    pub state_file: Option<PathBuf>,
}

impl RunSummary {
    fn absorb(&mut self, report: &BatchReport) {
        self.imported = report.imported;
        self.already_managed = report.already_managed;
        self.not_found = report.not_found;
        self.failed = report.failed;
    }
}

/// Drives one bulk import: ledger, addresses, batch, merge, cleanup
pub struct Orchestrator<'a> {
    config: &'a ImportConfig,
    fs: Arc<dyn FileSystem>,
    output: Arc<dyn Output>,
    executor: Arc<dyn Executor>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a ImportConfig,
        fs: Arc<dyn FileSystem>,
        output: Arc<dyn Output>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            config,
            fs,
            output,
            executor,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let ledger = Arc::new(ProgressLedger::load(
            Arc::clone(&self.fs),
            &self.config.ledger_path(),
        )?);

        let pending = self.pending_requests(&ledger, &mut summary)?;
        summary.scheduled = pending.len();

        if pending.is_empty() {
            self.output
                .info("Nothing to import, every address is already recorded");
            return Ok(summary);
        }

        self.bootstrap()?;

        self.output.section(&format!(
            "Importing {} resources ({} at a time)",
            pending.len(),
            self.config.concurrency
        ));

        let worker = ImportWorker::new(
            Arc::clone(&self.executor),
            Arc::clone(&self.fs),
            Arc::clone(&self.output),
            Arc::clone(&ledger),
            &self.config.working_dir,
            &self.config.region_env,
        );
        let scheduler = BatchScheduler::new(Arc::new(worker), self.config.concurrency);
        let report = scheduler.run(pending).await;
        summary.absorb(&report);

        if report.fragments.is_empty() {
            self.output
                .info("No new resources imported, state file left untouched");
            return Ok(summary);
        }

        let merger = StateMerger::new(Arc::clone(&self.fs));
        let state = merger.merge(&report.fragments, &self.config.terraform_version)?;
        let state_path = self.config.state_file_path();
        merger.write(&state, &state_path)?;
        self.output.success(&format!(
            "Wrote {} resources to {}",
            state.resources.len(),
            state_path.display()
        ));
        summary.state_file = Some(state_path);

        self.remove_fragments(&report.fragments);

        Ok(summary)
    }

    /// Parse the whole address file, dropping ledger entries and duplicates.
    /// Malformed input aborts before anything is scheduled.
    fn pending_requests(
        &self,
        ledger: &ProgressLedger,
        summary: &mut RunSummary,
    ) -> Result<Vec<ImportRequest>> {
        let source = AddressSource::open(
            self.fs.as_ref(),
            &self.config.addr_file_path(),
            &self.config.separator,
        )?;

        let mut pending = Vec::new();
        let mut seen = HashSet::new();

        for request in source {
            let request = request?;

            if ledger.contains(&request.address) {
                summary.skipped += 1;
                self.output.dimmed(&format!(
                    "[+] {} => SKIPPED | {} already imported",
                    request.describe(),
                    request.address
                ));
                continue;
            }

            if !seen.insert(request.address.clone()) {
                self.output.warning(&format!(
                    "{} appears more than once in the address file, keeping the first entry",
                    request.address
                ));
                continue;
            }

            pending.push(request);
        }

        debug!(
            pending = pending.len(),
            skipped = summary.skipped,
            "address file parsed"
        );
        Ok(pending)
    }

    /// Make sure the tool is usable before the first import
    fn bootstrap(&self) -> Result<()> {
        let name = self.executor.get_name().to_string();
        let working_dir = &self.config.working_dir;

        let installed = self.executor.check_installed(working_dir)?;
        self.output.status_check(&name, installed);
        if !installed {
            return Err(ImportError::Setup(format!("{} is not installed or not on PATH", name)).into());
        }

        self.output.info(&format!("Running {} init", name));
        self.executor
            .init(working_dir)
            .map_err(|e| ImportError::Setup(format!("{} init failed: {:#}", name, e)))?;

        Ok(())
    }

    fn remove_fragments(&self, fragments: &[PathBuf]) {
        for path in fragments {
            match self.fs.remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "fragment removed"),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "fragment cleanup failed");
                    self.output.warning(&format!(
                        "Could not remove fragment {}: {:#}",
                        path.display(),
                        e
                    ));
                }
            }
        }
    }
}
