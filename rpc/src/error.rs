use std::fmt;

/// Errors surfaced by the session client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An argument value fails the wire-safety whitelist, or the server
    /// sent a structurally malformed value
    IllegalArgument(String),
    /// The server rejected the call for a domain reason
    Remote(String),
    /// Transport failure or unparseable response envelope; never
    /// retried beyond the two recovery protocols
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IllegalArgument(msg) => write!(f, "{}", msg),
            Error::Remote(msg) => write!(f, "Error: {}", msg),
            Error::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
