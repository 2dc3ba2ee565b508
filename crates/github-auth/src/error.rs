//! Error types for token exchange operations

/// Errors from the outbound token exchange.
///
/// Validation failures on inbound requests never appear here — the proxy
/// handlers map those directly to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid response from provider")]
    InvalidResponse,
}

/// Result alias for exchange operations.
pub type Result<T> = std::result::Result<T, Error>;
