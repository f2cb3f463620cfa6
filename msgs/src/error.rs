use thiserror::Error;

/// Every failure that can cross a context boundary. Serialised as
/// `{"error": <variant>, "detail": ..}` so callers always get a structured
/// result instead of a dropped reply.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "error", content = "detail", rename_all = "snake_case")]
pub enum SyncError {
    #[error("No source tab registered.")]
    NoSourceBound,
    #[error("tab unreachable: {0}")]
    Unreachable(String),
    #[error("Game state had become old before the action was performed. Try again. (sent {requested}, page is at {current})")]
    StaleVersion { requested: u64, current: u64 },
    #[error("Could not find an active game. First join the game to watch, then click the extension icon.")]
    AnchorNotFound,
    #[error("{0}")]
    InvalidFormula(String),
    #[error("{0} is not a whole number")]
    NonIntegerResult(f64),
    #[error("Result is infinite!")]
    InfiniteResult,
    #[error("illegal game state: {0}")]
    IllegalSnapshot(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{operation} got no answer within {millis} ms")]
    Timeout { operation: String, millis: u64 },
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl SyncError {
    pub fn unreachable(reason: impl Into<String>) -> SyncError {
        SyncError::Unreachable(reason.into())
    }

    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> SyncError {
        SyncError::Timeout {
            operation: operation.into(),
            millis: duration.as_millis() as u64,
        }
    }

    /// Failures caused by the transport rather than by the request itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Unreachable(_) | SyncError::Timeout { .. } | SyncError::Malformed(_))
    }
}
