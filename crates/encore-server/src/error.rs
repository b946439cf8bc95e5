//! Error types for the encore server.

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// encore core error.
    #[error("Core error: {0}")]
    Core(#[from] encore_core::Error),

    /// Session not found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A pass task panicked or was cancelled by the runtime.
    #[error("Pass task failed: {0}")]
    Task(String),

    /// The session already has this many jobs waiting.
    #[error("Too many pending requests ({0} queued); wait for a pass to finish")]
    QueueFull(usize),

    /// The session's worker has stopped.
    #[error("Session no longer accepts work")]
    QueueClosed,

    /// Invalid server address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_cause() {
        let err: ServerError =
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use").into();
        assert!(matches!(err, ServerError::Io(_)));
        assert_eq!(err.to_string(), "IO error: address in use");
    }
}
