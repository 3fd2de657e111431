use super::executor::{Executor, ImportOptions};
use crate::traits::CommandExecutor;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Output;
use std::sync::Arc;
use tracing::debug;

/// Executor driving a Terraform-compatible CLI (`terraform` or `tofu`)
pub struct TerraformExecutor {
    name: String,
    binary: String,
    command: Arc<dyn CommandExecutor>,
}

impl TerraformExecutor {
    pub fn new(
        name: impl Into<String>,
        binary: impl Into<String>,
        command: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            binary: binary.into(),
            command,
        }
    }

    /// HashiCorp Terraform, resolved from PATH
    pub fn terraform(command: Arc<dyn CommandExecutor>) -> Self {
        Self::new("terraform", "terraform", command)
    }

    /// OpenTofu, resolved from PATH
    pub fn opentofu(command: Arc<dyn CommandExecutor>) -> Self {
        Self::new("opentofu", "tofu", command)
    }

    /// Use a specific binary instead of the one on PATH
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn import_args(address: &str, external_id: &str, options: &ImportOptions) -> Vec<String> {
        let mut args = vec![
            "import".to_string(),
            "-input=false".to_string(),
            "-no-color".to_string(),
        ];
        if !options.lock {
            args.push("-lock=false".to_string());
        }
        args.push(format!("-state={}", options.state.display()));
        args.push(format!("-state-out={}", options.state_out.display()));
        args.push(address.to_string());
        args.push(external_id.to_string());
        args
    }

    /// Text describing a failed run: stderr, or stdout when stderr is empty
    fn failure_text(output: &Output) -> String {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr.trim().to_string()
        }
    }
}

impl Executor for TerraformExecutor {
    fn check_installed(&self, working_dir: &Path) -> Result<bool> {
        match self
            .command
            .execute(&self.binary, &["version"], working_dir, &[])
        {
            Ok(output) => Ok(output.status.success()),
            Err(_) => Ok(false), // Command not found or failed to execute
        }
    }

    fn init(&self, working_dir: &Path) -> Result<()> {
        let output = self
            .command
            .execute(
                &self.binary,
                &["init", "-input=false", "-no-color", "-upgrade"],
                working_dir,
                &[],
            )
            .with_context(|| format!("Failed to execute {} init", self.binary))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} init exited with {}: {}",
                self.binary,
                output.status,
                Self::failure_text(&output)
            );
        }

        Ok(())
    }

    fn import(
        &self,
        working_dir: &Path,
        address: &str,
        external_id: &str,
        options: &ImportOptions,
    ) -> Result<()> {
        let args = Self::import_args(address, external_id, options);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!(binary = %self.binary, ?args, region = %options.region, "running import");

        let output = self.command.execute(
            &self.binary,
            &arg_refs,
            working_dir,
            &[(options.region_env.as_str(), options.region.as_str())],
        )?;

        if !output.status.success() {
            anyhow::bail!("{}", Self::failure_text(&output));
        }

        Ok(())
    }

    fn get_name(&self) -> &str {
        &self.name
    }
}
