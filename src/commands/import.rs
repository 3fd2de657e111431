use anyhow::{Context as _, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ConfigOverrides, ImportConfig};
use crate::context::Context;
use crate::executor::{Executor, TerraformExecutor};
use crate::import::{Orchestrator, RunSummary};

/// Bulk-import existing cloud resources into a Terraform state file
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Directory holding the Terraform configuration
    #[arg(short = 'd', long, env = "TFIMPORT_WORKING_DIR")]
    working_dir: Option<PathBuf>,

    /// File listing `address<sep>id<sep>region`, one per line
    #[arg(short = 'a', long, env = "TFIMPORT_ADDR_FILE")]
    addr_file: Option<PathBuf>,

    /// Ledger of already imported addresses [default: imported.txt]
    #[arg(short = 's', long, env = "TFIMPORT_SAVED_FILE")]
    saved_file: Option<PathBuf>,

    /// Field separator used in the address file [default: " "]
    #[arg(long, alias = "indicator", env = "TFIMPORT_SEPARATOR")]
    separator: Option<String>,

    /// Requests per worker-group and maximum simultaneous groups [default: 4]
    #[arg(short = 'c', long, env = "TFIMPORT_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Consolidated state file to write [default: terraform.tfstate]
    #[arg(long, env = "TFIMPORT_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Version recorded in the consolidated state [default: 1.1.6]
    #[arg(long, env = "TFIMPORT_TERRAFORM_VERSION")]
    terraform_version: Option<String>,

    /// Backend tool: terraform or opentofu [default: terraform]
    #[arg(long, env = "TFIMPORT_BACKEND")]
    backend: Option<String>,

    /// Path to the backend binary, overriding the backend's default
    #[arg(long, env = "TFIMPORT_BINARY")]
    binary: Option<String>,

    /// Environment variable that receives each resource's region [default: AWS_DEFAULT_REGION]
    #[arg(long, env = "TFIMPORT_REGION_ENV")]
    region_env: Option<String>,

    /// YAML file providing defaults for any of the options above
    #[arg(long, env = "TFIMPORT_CONFIG")]
    config: Option<PathBuf>,
}

impl ImportCommand {
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let config = self.build_config(ctx)?;
        tracing::debug!(?config, "configuration resolved");

        let executor = Self::resolve_executor(ctx, &config)?;

        ctx.output.section("Bulk import");
        ctx.output.key_value("Working directory", &config.working_dir.display().to_string());
        ctx.output.key_value("Address file", &config.addr_file_path().display().to_string());
        ctx.output.key_value("Backend", executor.get_name());

        let orchestrator = Orchestrator::new(
            &config,
            Arc::clone(&ctx.fs),
            Arc::clone(&ctx.output),
            executor,
        );

        let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
        let summary = runtime.block_on(orchestrator.run())?;

        Self::print_summary(ctx, &summary);
        Ok(())
    }

    fn build_config(&self, ctx: &Context) -> Result<ImportConfig> {
        let base = match &self.config {
            Some(path) => ImportConfig::from_file(ctx.fs.as_ref(), path)?,
            None => ImportConfig::default(),
        };

        let config = base.with_overrides(ConfigOverrides {
            working_dir: self.working_dir.clone(),
            addr_file: self.addr_file.clone(),
            saved_file: self.saved_file.clone(),
            separator: self.separator.clone(),
            concurrency: self.concurrency,
            state_file: self.state_file.clone(),
            terraform_version: self.terraform_version.clone(),
            backend: self.backend.clone(),
            binary: self.binary.clone(),
            region_env: self.region_env.clone(),
        })
        .with_absolute_working_dir()?;

        config.validate(ctx.fs.as_ref())?;
        Ok(config)
    }

    fn resolve_executor(ctx: &Context, config: &ImportConfig) -> Result<Arc<dyn Executor>> {
        let executor = ctx.executor_registry.get(&config.backend).with_context(|| {
            format!(
                "Unknown backend '{}' (available: {})",
                config.backend,
                ctx.executor_registry.list().join(", ")
            )
        })?;

        match &config.binary {
            Some(binary) => Ok(Arc::new(TerraformExecutor::new(
                executor.get_name(),
                binary.as_str(),
                Arc::clone(&ctx.command),
            ))),
            None => Ok(executor),
        }
    }

    fn print_summary(ctx: &Context, summary: &RunSummary) {
        let state = summary
            .state_file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "not written".to_string());

        ctx.output.summary(
            "Import summary",
            &[
                ("Skipped".to_string(), summary.skipped.to_string()),
                ("Attempted".to_string(), summary.scheduled.to_string()),
                ("Imported".to_string(), summary.imported.to_string()),
                ("Already managed".to_string(), summary.already_managed.to_string()),
                ("Not found".to_string(), summary.not_found.to_string()),
                ("Failed".to_string(), summary.failed.to_string()),
                ("State file".to_string(), state),
            ],
        );

        if summary.failed > 0 {
            ctx.output.warning(&format!(
                "{} imports failed; rerun to retry them",
                summary.failed
            ));
        }
    }
}
