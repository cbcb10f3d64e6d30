//! Error types for the device statistics service

/// Errors that can occur in the device statistics service
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for device statistics operations
pub type Result<T> = std::result::Result<T, StatsError>;
