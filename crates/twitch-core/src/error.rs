use thiserror::Error;

/// Errors surfaced by the client, the rate limiter and the send path.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Dial or handshake failure. Fatal for the connect call, never retried.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("cannot part from #{0}: channel was never joined")]
    PartNotJoined(String),

    #[error("points store failed: {0}")]
    Store(#[source] anyhow::Error),

    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,
}

impl ClientError {
    pub fn connect(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Connect {
            addr: addr.into(),
            source,
        }
    }

    /// Folds a failed PASS/NICK exchange into a connect error for `addr`.
    pub fn handshake(addr: impl Into<String>, err: ClientError) -> Self {
        let source = match err {
            ClientError::Write(io) => io,
            other => std::io::Error::other(other),
        };
        Self::connect(addr, source)
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
