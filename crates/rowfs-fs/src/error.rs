use rowfs_store::StoreError;
use rowfs_types::TypeError;

/// POSIX error numbers (Linux values) surfaced to the protocol layer.
pub mod errno {
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const EBADF: i32 = 9;
    pub const EEXIST: i32 = 17;
    pub const ENOTSUP: i32 = 95;
}

/// Errors from namespace operations.
///
/// Every error is terminal for the request that raised it; nothing is
/// retried here.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// No such group, field, or namespace node.
    #[error("no such entry: {0}")]
    NotFound(String),

    /// The operation does not apply to this kind of entry.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// The backing store failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// A group with this name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The file handle is unknown or already released.
    #[error("bad file handle: {0}")]
    BadHandle(u64),
}

impl FsError {
    /// The errno a protocol binding should reply with.
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound(_) => errno::ENOENT,
            Self::Unsupported(_) => errno::ENOTSUP,
            Self::StoreUnavailable(_) => errno::EIO,
            Self::AlreadyExists(_) => errno::EEXIST,
            Self::BadHandle(_) => errno::EBADF,
        }
    }
}

impl From<StoreError> for FsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateGroup(name) => Self::AlreadyExists(name),
            StoreError::GroupNotFound(name) => Self::NotFound(name),
            StoreError::UnknownColumn(name) => Self::NotFound(name),
            StoreError::UnknownField(field) => Self::NotFound(format!("field #{}", field.index())),
            other => Self::StoreUnavailable(other),
        }
    }
}

impl From<TypeError> for FsError {
    fn from(err: TypeError) -> Self {
        Self::StoreUnavailable(StoreError::Type(err))
    }
}

/// Result alias for namespace operations.
pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(FsError::NotFound("x".into()).errno(), errno::ENOENT);
        assert_eq!(FsError::Unsupported("x".into()).errno(), errno::ENOTSUP);
        assert_eq!(FsError::AlreadyExists("x".into()).errno(), errno::EEXIST);
        assert_eq!(FsError::BadHandle(7).errno(), errno::EBADF);
        assert_eq!(
            FsError::StoreUnavailable(StoreError::Unavailable("down".into())).errno(),
            errno::EIO
        );
    }

    #[test]
    fn store_errors_convert() {
        let dup: FsError = StoreError::DuplicateGroup("a".into()).into();
        assert!(matches!(dup, FsError::AlreadyExists(n) if n == "a"));

        let gone: FsError = StoreError::GroupNotFound("a".into()).into();
        assert!(matches!(gone, FsError::NotFound(_)));

        let down: FsError = StoreError::Unavailable("refused".into()).into();
        assert!(matches!(down, FsError::StoreUnavailable(_)));

        let enc: FsError = StoreError::InvalidEncoding.into();
        assert_eq!(enc.errno(), errno::EIO);
    }

    #[test]
    fn type_errors_are_io() {
        let err: FsError = TypeError::InodeOverflow { row: 1, base: 16 }.into();
        assert_eq!(err.errno(), errno::EIO);
    }
}
