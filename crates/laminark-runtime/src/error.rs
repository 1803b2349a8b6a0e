use std::fmt;

/// Result type for laminark-runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer.
#[derive(Debug)]
pub enum Error {
    /// Storage layer error.
    Storage(laminark_storage::Error),
    /// Graph engine error (duplicate finding, detector, path tracker).
    Graph(laminark_graph::Error),
    /// Intelligence-client error (LLM/embedding port, agent schema).
    Clients(laminark_clients::Error),
    /// Domain type error surfaced from `laminark-types` (e.g. hook envelope
    /// parsing for a closed-set field).
    Types(laminark_types::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Storage(err) => write!(f, "storage error: {err}"),
            Error::Graph(err) => write!(f, "graph error: {err}"),
            Error::Clients(err) => write!(f, "client error: {err}"),
            Error::Types(err) => write!(f, "type error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Storage(err) => Some(err),
            Error::Graph(err) => Some(err),
            Error::Clients(err) => Some(err),
            Error::Types(err) => Some(err),
        }
    }
}

impl From<laminark_storage::Error> for Error {
    fn from(err: laminark_storage::Error) -> Self {
        Error::Storage(err)
    }
}

impl From<laminark_graph::Error> for Error {
    fn from(err: laminark_graph::Error) -> Self {
        Error::Graph(err)
    }
}

impl From<laminark_clients::Error> for Error {
    fn from(err: laminark_clients::Error) -> Self {
        Error::Clients(err)
    }
}

impl From<laminark_types::Error> for Error {
    fn from(err: laminark_types::Error) -> Self {
        Error::Types(err)
    }
}
