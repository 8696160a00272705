//! Typed errors surfaced to the CLI and library callers.

use std::fmt;
use std::io;

/// Error type for all sopdrop operations. No automatic retries anywhere:
/// every failure surfaces directly to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SopdropError {
    /// Missing or rejected credentials.
    Auth(String),
    /// Unknown asset, version, or endpoint.
    NotFound(String),
    /// Transport-level failure (DNS, connect, timeout).
    Network(String),
    /// Non-2xx response other than 401/404.
    Server { status: u16, message: String },
    /// Malformed slug, version string, or response body.
    Parse(String),
    /// Local filesystem failure.
    Io(String),
    /// Cache bookkeeping failure (e.g. checksum mismatch after download).
    Cache(String),
    /// Operation does not apply to this asset kind.
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, SopdropError>;

impl fmt::Display for SopdropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SopdropError::Auth(msg) => write!(f, "Authentication required: {}", msg),
            SopdropError::NotFound(msg) => write!(f, "Not found: {}", msg),
            SopdropError::Network(msg) => write!(f, "Connection error: {}", msg),
            SopdropError::Server { status, message } => {
                write!(f, "API error ({}): {}", status, message)
            }
            SopdropError::Parse(msg) => write!(f, "Parse error: {}", msg),
            SopdropError::Io(msg) => write!(f, "I/O error: {}", msg),
            SopdropError::Cache(msg) => write!(f, "Cache error: {}", msg),
            SopdropError::Unsupported(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SopdropError {}

impl From<io::Error> for SopdropError {
    fn from(e: io::Error) -> Self {
        SopdropError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for SopdropError {
    fn from(e: serde_json::Error) -> Self {
        SopdropError::Parse(e.to_string())
    }
}
