use std::fmt;
use std::path::PathBuf;

/// Fatal error kinds of a bulk import run.
///
/// Non-fatal outcomes (skips, benign backend answers, transient failures) are
/// not errors; they are reported per resource by the worker.
#[derive(Debug)]
pub enum ImportError {
    /// Ledger, address file or backend unusable before any import starts
    Setup(String),

    /// An address file line did not split into exactly three fields
    MalformedInput {
        line_number: usize,
        fields: usize,
        line: String,
    },

    /// A state fragment could not be read or parsed during consolidation
    Merge { path: PathBuf, message: String },

    /// Invalid configuration value
    Config(String),

    /// General I/O error
    Io(std::io::Error),

    /// Serialization error
    Serialization(String),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Setup(msg) => {
                write!(f, "Setup failed: {}", msg)
            }
            ImportError::MalformedInput {
                line_number,
                fields,
                line,
            } => {
                write!(
                    f,
                    "Malformed input on line {}: expected 3 fields (address, id, region) but found {}: '{}'. Check the separator",
                    line_number, fields, line
                )
            }
            ImportError::Merge { path, message } => {
                write!(
                    f,
                    "Failed to merge state fragment {}: {}",
                    path.display(),
                    message
                )
            }
            ImportError::Config(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
            ImportError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            ImportError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Io(err)
    }
}

impl From<serde_yaml::Error> for ImportError {
    fn from(err: serde_yaml::Error) -> Self {
        ImportError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Serialization(err.to_string())
    }
}
