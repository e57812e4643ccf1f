//! Per-connection error taxonomy.

use std::io;

/// Errors raised while serving a single connection.
///
/// None of these escape the connection task. `Io` and `MalformedRequest`
/// close the connection without a response; `NotFound` and `Internal` are
/// turned into 404 and 500 responses by the router.
#[derive(Debug)]
pub enum HttpError {
    /// Socket or file read/write failure
    Io(io::Error),
    /// Unparseable start line or oversized head
    MalformedRequest(String),
    /// No such route or file
    NotFound,
    /// File creation/open failure other than not-found
    Internal(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::Io(e) => write!(f, "I/O error: {}", e),
            HttpError::MalformedRequest(msg) => write!(f, "Malformed request: {}", msg),
            HttpError::NotFound => write!(f, "Not found"),
            HttpError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HttpError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for HttpError {
    fn from(e: io::Error) -> Self {
        HttpError::Io(e)
    }
}
