use std::fmt;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the LLM/embedding ports and the agents built on them.
#[derive(Debug)]
pub enum Error {
    /// Cannot reach the service, or the transport itself failed.
    ConnectionFailed(String),
    /// 401/403 from the service.
    Unauthorized,
    /// 429 Too Many Requests.
    RateLimited,
    /// Server returned a 5xx.
    ServerError(u16, String),
    /// Response body was not valid JSON, or not UTF-8 text.
    ParseError(String),
    /// An agent's JSON extraction found no candidate object in the response.
    NoJsonFound,
    /// An agent's output parsed as JSON but didn't match the expected schema
    /// (includes out-of-taxonomy `type` values, since those fail enum
    /// deserialization rather than a separate validation step).
    SchemaViolation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConnectionFailed(msg) => write!(f, "connection failed: {msg}"),
            Error::Unauthorized => write!(f, "unauthorized: invalid or missing credentials"),
            Error::RateLimited => write!(f, "rate limited"),
            Error::ServerError(status, msg) => write!(f, "server error ({status}): {msg}"),
            Error::ParseError(msg) => write!(f, "parse error: {msg}"),
            Error::NoJsonFound => write!(f, "no JSON object found in agent response"),
            Error::SchemaViolation(msg) => write!(f, "schema violation: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
