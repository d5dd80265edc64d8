use thiserror::Error;

/// Main error type for the proxywarden supervisor
///
/// These never reach the lifecycle caller; the supervisor converts every
/// failure into log-sink lines at its boundary.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Resolved command has no executable token")]
    EmptyCommand,

    #[error("Failed to spawn process: {0}")]
    SpawnError(String),

    #[error("Signal error: {0}")]
    SignalError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for proxywarden operations
pub type Result<T> = std::result::Result<T, SupervisorError>;
