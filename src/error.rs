use thiserror::Error;

/// Errors returned by certificate service operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A local precondition failed; no request was sent.
    #[error("{0}")]
    Precondition(String),

    /// The service returned a non-success HTTP status.
    #[error("Certificate service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The service reported `success: false` with a message.
    #[error("{0}")]
    Job(String),

    /// The response from the service was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ClientError {
    fn from(err: anyhow::Error) -> Self {
        ClientError::Other(err.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ClientError>;
