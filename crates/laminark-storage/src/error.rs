use std::fmt;

/// Result type for laminark-storage operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Database operation failed.
    Database(rusqlite::Error),

    /// IO operation failed.
    Io(std::io::Error),

    /// Query-specific error (invalid input, not found, constraint violated).
    Query(String),

    /// A stored value could not be decoded back into a domain type.
    Decode(laminark_types::Error),

    /// A unique-constraint violation that the caller should treat as a
    /// duplicate rather than a hard failure (e.g. the save-guard digest
    /// index, or a node-identity collision raced by a concurrent writer).
    Duplicate(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => write!(f, "database error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Query(msg) => write!(f, "query error: {}", msg),
            Error::Decode(err) => write!(f, "decode error: {}", err),
            Error::Duplicate(what) => write!(f, "duplicate: {}", what),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Query(_) => None,
            Error::Decode(err) => Some(err),
            Error::Duplicate(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        if is_unique_violation(&err) {
            return Error::Duplicate(err.to_string());
        }
        Error::Database(err)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                ..
            },
            _,
        )
    )
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<laminark_types::Error> for Error {
    fn from(err: laminark_types::Error) -> Self {
        Error::Decode(err)
    }
}
