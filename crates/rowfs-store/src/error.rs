use rowfs_types::{FieldId, TypeError};

/// Errors from data store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection or query failure in the backing store.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A group with this name already exists.
    #[error("group already exists: {0}")]
    DuplicateGroup(String),

    /// An update matched no row with this name.
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// The field id does not belong to this store's catalog.
    #[error("field {0:?} is not in the catalog")]
    UnknownField(FieldId),

    /// Seed data named a column that is not in the catalog.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// Written bytes are not valid UTF-8 and cannot be stored as text.
    #[error("value is not valid UTF-8")]
    InvalidEncoding,

    /// A result row could not be decoded.
    #[error("cannot decode row: {0}")]
    Decode(String),

    /// JSON serialization of a stored value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
