//! Error types for the viewer client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Identity has not been resolved through the host bridge yet
    #[error("Identity is not resolved; chat submission is disabled")]
    IdentityUnresolved,
}
