//! Error types for external command execution

use thiserror::Error;

/// Errors that can occur when running `git` or `gh`
#[derive(Error, Debug)]
pub enum CliError {
    /// The command exited with a non-zero status
    #[error("{program} command failed (exit code {code}): {stderr}")]
    CommandFailed {
        program: &'static str,
        code: i32,
        stderr: String,
    },

    /// Failed to spawn the process
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),

    /// Failed to parse JSON output
    #[error("failed to parse command JSON output: {0}")]
    Parse(#[from] serde_json::Error),

    /// The program is not installed or not in PATH
    #[error("{program} not found - ensure it is installed and in PATH")]
    NotFound { program: &'static str },

    /// gh is installed but has no credentials
    #[error("gh CLI not authenticated - run 'gh auth login' first")]
    NotAuthenticated,
}

pub type CliResult<T> = Result<T, CliError>;
