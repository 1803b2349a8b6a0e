use std::fmt;

/// Result type for laminark-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the types layer
#[derive(Debug)]
pub enum Error {
    /// A closed-taxonomy string did not match any known variant
    UnknownVariant { field: &'static str, value: String },
    /// A value failed a structural invariant (e.g. weight out of range)
    InvalidValue { field: &'static str, reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownVariant { field, value } => {
                write!(f, "unknown value {:?} for {}", value, field)
            }
            Error::InvalidValue { field, reason } => {
                write!(f, "invalid value for {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for Error {}
