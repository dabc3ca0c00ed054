use std::io;

/// Custom error type for push-deploy operations
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Command failed: {command} (exit code {})", .exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
    },

    #[error("Command timed out: {command} (after {timeout_secs}s)")]
    CommandTimedOut { command: String, timeout_secs: u64 },

    #[error("Command failed to start: {command}: {source}")]
    CommandSpawn { command: String, source: io::Error },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DeployError {
    /// The rendered command line of the failing step, if this error carries one.
    pub fn command(&self) -> Option<&str> {
        match self {
            DeployError::CommandFailed { command, .. }
            | DeployError::CommandTimedOut { command, .. }
            | DeployError::CommandSpawn { command, .. } => Some(command),
            _ => None,
        }
    }
}

/// Helper type for Results that use DeployError
pub type Result<T> = std::result::Result<T, DeployError>;
