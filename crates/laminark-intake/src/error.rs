use std::fmt;

/// Result type for laminark-intake operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// A configured redaction pattern does not compile as a regex.
    Pattern(regex::Error),

    /// The hook envelope is missing a field this event type requires.
    Malformed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Pattern(err) => write!(f, "invalid redaction pattern: {}", err),
            Error::Malformed(msg) => write!(f, "malformed hook event: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Pattern(err) => Some(err),
            Error::Malformed(_) => None,
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Pattern(err)
    }
}
