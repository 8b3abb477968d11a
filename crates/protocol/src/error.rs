//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or encoding envelopes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid `{kind}` payload: {reason}")]
    InvalidPayload { kind: &'static str, reason: &'static str },

    #[error("Failed to encode `{kind}`: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
