//! Error types for the CLI.

use core_types::{ParseError, RuntimeError};
use interpreter::LoadError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Program execution failed
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Source failed to parse
    #[error("syntax error: {0}")]
    Parse(#[from] ParseError),

    /// File I/O failed
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// The interactive shell failed
    #[error("shell error: {0}")]
    Repl(String),
}

impl From<LoadError> for CliError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Parse(e) => CliError::Parse(e),
            LoadError::Runtime(e) => CliError::Runtime(e),
        }
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
