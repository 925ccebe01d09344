use std::time::Duration;

use thiserror::Error;

/// Failure taxonomy for board operations. Handlers convert these into a
/// uniform `{"status":"error","message"}` body at the operation boundary.
#[derive(Debug, Error)]
pub enum BoardError {
    /// The operation lock was not acquired within the bound. Retryable.
    #[error("could not acquire reaction lock within {0:?}")]
    LockTimeout(Duration),

    /// The sheet is missing an expected header. The tenant needs to
    /// reconfigure the sheet mapping.
    #[error("column '{0}' not found in sheet headers")]
    ColumnNotFound(String),

    /// An underlying row-store read or write failed. Retryable; the caller
    /// should re-fetch the row's reaction state before trusting optimistic UI.
    #[error("row store update failed")]
    UpdateFailed(#[source] anyhow::Error),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl BoardError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BoardError::LockTimeout(_) | BoardError::UpdateFailed(_))
    }
}
