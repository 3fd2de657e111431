//! Run configuration.
//!
//! Built once at startup from an optional YAML file plus command-line
//! overrides, validated, then passed by reference to everything else.

use crate::error::ImportError;
use crate::traits::FileSystem;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LEDGER_FILE: &str = "imported.txt";
pub const DEFAULT_SEPARATOR: &str = " ";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_STATE_FILE: &str = "terraform.tfstate";
pub const DEFAULT_TERRAFORM_VERSION: &str = "1.1.6";
pub const DEFAULT_BACKEND: &str = "terraform";
pub const DEFAULT_REGION_ENV: &str = "AWS_DEFAULT_REGION";

/// Immutable settings for one import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Directory the backend runs in; relative paths below resolve against it
    pub working_dir: PathBuf,
    /// Address file, one `address<sep>id<sep>region` per line
    pub addr_file: PathBuf,
    /// Ledger of already processed addresses
    pub saved_file: PathBuf,
    /// Field separator used in the address file
    pub separator: String,
    /// Number of requests per worker-group and maximum simultaneous groups
    pub concurrency: usize,
    /// Consolidated state file written at the end of the run
    pub state_file: PathBuf,
    /// Tool version recorded in the consolidated state
    pub terraform_version: String,
    /// Registered backend name (`terraform` or `opentofu`)
    pub backend: String,
    /// Override for the backend binary path
    pub binary: Option<String>,
    /// Environment variable that receives each request's region
    pub region_env: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::new(),
            addr_file: PathBuf::new(),
            saved_file: PathBuf::from(DEFAULT_LEDGER_FILE),
            separator: DEFAULT_SEPARATOR.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            terraform_version: DEFAULT_TERRAFORM_VERSION.to_string(),
            backend: DEFAULT_BACKEND.to_string(),
            binary: None,
            region_env: DEFAULT_REGION_ENV.to_string(),
        }
    }
}

/// Values supplied on the command line; `None` keeps the file/default value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub working_dir: Option<PathBuf>,
    pub addr_file: Option<PathBuf>,
    pub saved_file: Option<PathBuf>,
    pub separator: Option<String>,
    pub concurrency: Option<usize>,
    pub state_file: Option<PathBuf>,
    pub terraform_version: Option<String>,
    pub backend: Option<String>,
    pub binary: Option<String>,
    pub region_env: Option<String>,
}

impl ImportConfig {
    /// Load a YAML config file
    pub fn from_file(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let content = fs
            .read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ImportConfig = serde_yaml::from_str(&content)
            .map_err(ImportError::from)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply command-line overrides on top of this config
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(v) = overrides.working_dir {
            self.working_dir = v;
        }
        if let Some(v) = overrides.addr_file {
            self.addr_file = v;
        }
        if let Some(v) = overrides.saved_file {
            self.saved_file = v;
        }
        if let Some(v) = overrides.separator {
            self.separator = v;
        }
        if let Some(v) = overrides.concurrency {
            self.concurrency = v;
        }
        if let Some(v) = overrides.state_file {
            self.state_file = v;
        }
        if let Some(v) = overrides.terraform_version {
            self.terraform_version = v;
        }
        if let Some(v) = overrides.backend {
            self.backend = v;
        }
        if overrides.binary.is_some() {
            self.binary = overrides.binary;
        }
        if let Some(v) = overrides.region_env {
            self.region_env = v;
        }
        self
    }

    /// Make the working directory absolute against the current directory.
    ///
    /// The backend runs inside the working directory while fragment and
    /// ledger paths are joined onto it, so a relative value would be applied
    /// twice.
    pub fn with_absolute_working_dir(mut self) -> Result<Self, ImportError> {
        if self.working_dir.as_os_str().is_empty() || self.working_dir.is_absolute() {
            return Ok(self);
        }

        self.working_dir = std::path::absolute(&self.working_dir).map_err(|e| {
            ImportError::Config(format!(
                "cannot resolve working directory {}: {}",
                self.working_dir.display(),
                e
            ))
        })?;
        Ok(self)
    }

    /// Reject configurations that cannot drive a run
    pub fn validate(&self, fs: &dyn FileSystem) -> Result<(), ImportError> {
        if self.working_dir.as_os_str().is_empty() {
            return Err(ImportError::Config(
                "working directory is required (--working-dir)".to_string(),
            ));
        }
        if !fs.is_dir(&self.working_dir) {
            return Err(ImportError::Config(format!(
                "working directory does not exist: {}",
                self.working_dir.display()
            )));
        }
        if self.addr_file.as_os_str().is_empty() {
            return Err(ImportError::Config(
                "address file is required (--addr-file)".to_string(),
            ));
        }
        if self.separator.is_empty() {
            return Err(ImportError::Config("separator must not be empty".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ImportError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.region_env.is_empty() {
            return Err(ImportError::Config(
                "region environment variable name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn addr_file_path(&self) -> PathBuf {
        self.resolve(&self.addr_file)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.resolve(&self.saved_file)
    }

    pub fn state_file_path(&self) -> PathBuf {
        self.resolve(&self.state_file)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockFileSystem;

    fn valid_config() -> ImportConfig {
        ImportConfig {
            working_dir: PathBuf::from("/work"),
            addr_file: PathBuf::from("addresses.txt"),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_match_original_tool() {
        let config = ImportConfig::default();
        assert_eq!(config.saved_file, PathBuf::from("imported.txt"));
        assert_eq!(config.separator, " ");
        assert_eq!(config.terraform_version, "1.1.6");
        assert_eq!(config.state_file, PathBuf::from("terraform.tfstate"));
        assert_eq!(config.region_env, "AWS_DEFAULT_REGION");
    }

    #[test]
    fn test_from_file_fills_missing_fields_with_defaults() {
        let fs = MockFileSystem::new().with_file(
            "/cfg.yaml",
            "working_dir: /work\naddr_file: addrs.txt\nconcurrency: 8\n",
        );

        let config = ImportConfig::from_file(&fs, Path::new("/cfg.yaml")).unwrap();

        assert_eq!(config.working_dir, PathBuf::from("/work"));
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.separator, " ");
        assert_eq!(config.backend, "terraform");
    }

    #[test]
    fn test_from_file_rejects_invalid_yaml() {
        let fs = MockFileSystem::new().with_file("/cfg.yaml", "concurrency: [not a number");
        assert!(ImportConfig::from_file(&fs, Path::new("/cfg.yaml")).is_err());
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        let config = valid_config().with_overrides(ConfigOverrides {
            separator: Some(",".to_string()),
            concurrency: Some(2),
            binary: Some("/opt/tf".to_string()),
            ..Default::default()
        });

        assert_eq!(config.separator, ",");
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.binary.as_deref(), Some("/opt/tf"));
        assert_eq!(config.addr_file, PathBuf::from("addresses.txt"));
    }

    #[test]
    fn test_paths_resolve_against_working_dir() {
        let mut config = valid_config();
        config.state_file = PathBuf::from("/abs/state.tfstate");

        assert_eq!(config.addr_file_path(), PathBuf::from("/work/addresses.txt"));
        assert_eq!(config.ledger_path(), PathBuf::from("/work/imported.txt"));
        assert_eq!(config.state_file_path(), PathBuf::from("/abs/state.tfstate"));
    }

    #[test]
    fn test_validate() {
        let fs = MockFileSystem::new().with_dir("/work");
        assert!(valid_config().validate(&fs).is_ok());

        let missing_dir = ImportConfig {
            working_dir: PathBuf::from("/nowhere"),
            ..valid_config()
        };
        assert!(missing_dir.validate(&fs).is_err());

        let zero = ImportConfig {
            concurrency: 0,
            ..valid_config()
        };
        assert!(matches!(zero.validate(&fs), Err(ImportError::Config(_))));

        let empty_sep = ImportConfig {
            separator: String::new(),
            ..valid_config()
        };
        assert!(empty_sep.validate(&fs).is_err());

        let no_addr = ImportConfig {
            addr_file: PathBuf::new(),
            ..valid_config()
        };
        assert!(no_addr.validate(&fs).is_err());
    }

    #[test]
    fn test_relative_working_dir_becomes_absolute() {
        let config = ImportConfig {
            working_dir: PathBuf::from("infra"),
            ..valid_config()
        }
        .with_absolute_working_dir()
        .unwrap();

        let expected = std::env::current_dir().unwrap().join("infra");
        assert!(config.working_dir.is_absolute());
        assert_eq!(config.working_dir, expected);
        assert_eq!(config.ledger_path(), expected.join("imported.txt"));
    }

    #[test]
    fn test_absolute_working_dir_is_kept() {
        let config = valid_config().with_absolute_working_dir().unwrap();
        assert_eq!(config.working_dir, PathBuf::from("/work"));
    }
}
