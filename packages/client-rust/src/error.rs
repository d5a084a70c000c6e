//! Client-side error taxonomy.

/// An error surfaced to a client caller.
///
/// Negative protocol results (`NOT_FOUND`, `NOT_STORED`, a `get` miss) are
/// normal return values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level failure on the TCP connection.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// No bytes arrived within the configured request timeout.
    #[error("timeout")]
    Timeout,

    /// The server answered `ERROR` or a `CLIENT_ERROR` line; the message is
    /// preserved verbatim.
    #[error("{0}")]
    Server(String),

    /// The server's response did not match the expected shape.
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// (De)serializing a structured value failed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A location string could not be parsed as `host:port`.
    #[error("invalid endpoint: {0}")]
    BadEndpoint(String),

    /// The client was constructed with no endpoints.
    #[error("no endpoints available")]
    NoEndpoints,
}

/// Shorthand result for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
