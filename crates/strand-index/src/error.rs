use thiserror::Error;

/// Errors from index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The requested mapping entry does not exist.
    #[error("mapping not found")]
    NotFound,

    /// The underlying database returned an error.
    #[error("index database error: {0}")]
    Db(#[from] sled::Error),

    /// A persisted value could not be decoded.
    #[error("malformed index entry: {0}")]
    Malformed(String),
}

/// Result alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
