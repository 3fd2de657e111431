use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Output};

/// Trait for executing system commands, allowing for mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments and extra environment variables,
    /// capturing its output
    fn execute(
        &self,
        command: &str,
        args: &[&str],
        working_dir: &Path,
        envs: &[(&str, &str)],
    ) -> Result<Output>;
}

/// Real command executor using std::process::Command
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(
        &self,
        command: &str,
        args: &[&str],
        working_dir: &Path,
        envs: &[(&str, &str)],
    ) -> Result<Output> {
        let output = Command::new(command)
            .args(args)
            .envs(envs.iter().copied())
            .current_dir(working_dir)
            .output()
            .with_context(|| format!("Failed to execute {}", command))?;

        Ok(output)
    }
}

/// Mock command executor for testing
#[cfg(test)]
pub struct MockCommandExecutor {
    /// Pre-configured outputs for commands
    outputs: std::sync::Mutex<Vec<MockCommandResult>>,
    /// Every invocation, in call order
    calls: std::sync::Mutex<Vec<MockCommandCall>>,
}

#[cfg(test)]
#[derive(Clone, Debug)]
pub struct MockCommandResult {
    pub command: String,
    /// When set, the result only answers invocations carrying this argument
    pub arg: Option<String>,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub struct MockCommandCall {
    pub command: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

#[cfg(test)]
impl MockCommandExecutor {
    pub fn new() -> Self {
        Self {
            outputs: std::sync::Mutex::new(Vec::new()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_outputs(outputs: Vec<MockCommandResult>) -> Self {
        Self {
            outputs: std::sync::Mutex::new(outputs),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<MockCommandCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Default for MockCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl CommandExecutor for MockCommandExecutor {
    fn execute(
        &self,
        command: &str,
        args: &[&str],
        _working_dir: &Path,
        envs: &[(&str, &str)],
    ) -> Result<Output> {
        self.calls.lock().unwrap().push(MockCommandCall {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });

        let mut outputs = self.outputs.lock().unwrap();

        if let Some(result) = outputs.iter().position(|r| {
            r.command == command && r.arg.as_deref().is_none_or(|a| args.contains(&a))
        }) {
            let mock_result = outputs.remove(result);
            return Ok(Output {
                status: create_exit_status(mock_result.exit_code),
                stdout: mock_result.stdout.into_bytes(),
                stderr: mock_result.stderr.into_bytes(),
            });
        }

        // Default: successful empty output
        Ok(Output {
            status: create_exit_status(0),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

#[cfg(test)]
fn create_exit_status(code: i32) -> std::process::ExitStatus {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status: the exit code lives in the second byte
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mock_executor_returns_configured_output() {
        let executor = MockCommandExecutor::with_outputs(vec![MockCommandResult {
            command: "terraform".to_string(),
            arg: None,
            exit_code: 0,
            stdout: "success".to_string(),
            stderr: String::new(),
        }]);

        let output = executor
            .execute("terraform", &[], &PathBuf::from("."), &[])
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "success");
    }

    #[test]
    fn test_mock_executor_default_success() {
        let executor = MockCommandExecutor::new();
        let output = executor
            .execute("unknown", &[], &PathBuf::from("."), &[])
            .unwrap();
        assert!(output.status.success());
    }

    #[test]
    fn test_mock_executor_matches_on_argument() {
        let executor = MockCommandExecutor::with_outputs(vec![MockCommandResult {
            command: "terraform".to_string(),
            arg: Some("aws_s3_bucket.b".to_string()),
            exit_code: 1,
            stdout: String::new(),
            stderr: "Error: boom".to_string(),
        }]);

        let other = executor
            .execute("terraform", &["aws_s3_bucket.a"], &PathBuf::from("."), &[])
            .unwrap();
        assert!(other.status.success());

        let matched = executor
            .execute("terraform", &["aws_s3_bucket.b"], &PathBuf::from("."), &[])
            .unwrap();
        assert!(!matched.status.success());
        assert_eq!(matched.status.code(), Some(1));
    }

    #[test]
    fn test_mock_executor_records_envs() {
        let executor = MockCommandExecutor::new();
        executor
            .execute(
                "terraform",
                &["import"],
                &PathBuf::from("."),
                &[("AWS_DEFAULT_REGION", "eu-west-1")],
            )
            .unwrap();

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].envs,
            vec![("AWS_DEFAULT_REGION".to_string(), "eu-west-1".to_string())]
        );
    }
}
