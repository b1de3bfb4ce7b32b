use reach_graph::SinkError;
use reach_oid::{OidError, Version};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the identity.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The caller's version no longer matches the stored one.
    #[error("{oid} was changed concurrently: held {held}, stored {stored}")]
    Concurrency {
        oid: String,
        held: Version,
        stored: Version,
    },

    /// A queued command cannot be executed.
    #[error("cannot store {oid}: {reason}")]
    InvalidCommand { oid: String, reason: String },

    /// The stored version cannot be bumped any further.
    #[error("{0}: version sequence is exhausted")]
    SequenceExhausted(String),

    /// The configuration could not be parsed.
    #[error("invalid store configuration: {0}")]
    Config(String),

    /// I/O error while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Oid(#[from] OidError),
}

impl From<StoreError> for SinkError {
    fn from(err: StoreError) -> Self {
        let (oid, reason) = match err {
            StoreError::NotFound(oid) => (oid, "not found".to_string()),
            StoreError::SequenceExhausted(ref oid) => (oid.clone(), err.to_string()),
            StoreError::Concurrency { ref oid, .. } | StoreError::InvalidCommand { ref oid, .. } => {
                (oid.clone(), err.to_string())
            }
            other => (String::new(), other.to_string()),
        };
        SinkError::Rejected { oid, reason }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
