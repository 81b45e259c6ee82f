//! Venue error types.

/// Errors that can occur during venue operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Network failure or timeout before a response arrived.
    #[error("connection error: {0}")]
    Connection(String),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    /// Amount cannot be expressed in the asset's base units.
    #[error("invalid amount: {0}")]
    Amount(String),

    #[error("{0}")]
    Other(String),
}

impl BrokerError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BrokerError::Connection(_) => true,
            BrokerError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
