//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or encoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed client message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Non-finite coordinate in move message")]
    NonFiniteCoordinate,

    #[error("Failed to encode server message: {0}")]
    Encode(#[source] serde_json::Error),
}
