//! Durable state error types.

/// Errors raised while loading or saving durable state
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Temp file could not be renamed over the destination
    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the instance lock
    #[error("Instance lock {0} is held by another process")]
    Locked(String),

    /// Path has no parent directory to stage the temp file in
    #[error("No parent directory for {0}")]
    NoParentDir(String),
}

/// Result type alias for durable state operations
pub type StoreResult<T> = Result<T, StoreError>;
