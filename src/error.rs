use crate::store::StoreError;

/// Core error taxonomy for archive and module-lock operations.
///
/// `InvalidInput` and `PermissionDenied` are raised before any write is
/// issued. `Store` wraps a remote failure; prior writes in the same
/// operation are not rolled back.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ArchiveError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ArchiveError::InvalidInput(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        ArchiveError::PermissionDenied(message.into())
    }

    /// Client-facing summary used for toast messages.
    pub fn message(&self) -> String {
        match self {
            ArchiveError::InvalidInput(msg) => msg.clone(),
            ArchiveError::PermissionDenied(msg) => msg.clone(),
            ArchiveError::Store(err) => err.to_string(),
        }
    }
}

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;
