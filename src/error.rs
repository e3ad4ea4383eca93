use thiserror::Error;

/// Errors returned by generation backend operations.
#[derive(Error, Debug)]
pub enum GenError {
    /// Input rejected locally, before any request was made.
    #[error("{0}")]
    Validation(String),

    /// The backend returned a non-success HTTP status.
    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response from the backend was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// The backend reported a logical failure in its response body.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenError {
    /// True when the request never got a response (connection refused,
    /// DNS failure, request timeout).
    pub fn is_transport(&self) -> bool {
        matches!(self, GenError::Network { .. })
    }

    /// True when the backend answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GenError::Http { status: 404, .. })
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, GenError>;
