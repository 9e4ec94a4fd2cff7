use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier {name:?}: {reason}")]
    InvalidIdent { name: String, reason: String },

    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    #[error("too many fields: {count} configured, inode base {base} allows at most {max}")]
    TooManyFields { count: usize, base: u64, max: u64 },

    #[error("invalid inode base {0}: must be at least 2")]
    InvalidBase(u64),

    #[error("row id must be positive")]
    ZeroRowId,

    #[error("inode overflow for row {row} with base {base}")]
    InodeOverflow { row: u64, base: u64 },
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
