use strand_types::RefId;

/// Errors from reference store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob or mapping does not exist.
    #[error("object not found: {0}")]
    NotFound(RefId),

    /// Filesystem, permission, or disk-full failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The metadata index returned an error.
    #[error("index error: {0}")]
    Index(#[from] strand_index::IndexError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
