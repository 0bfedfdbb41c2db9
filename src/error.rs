//! Error types for cyanite

/// Result type alias for cyanite operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cyanite
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The search index rejected a query (HTTP 400)
    #[error("malformed index query: {query}")]
    IndexQueryMalformed { query: String },
    /// A glob matched more paths than the configured threshold
    #[error("too many paths: {count} matched, threshold is {threshold}")]
    TooManyPaths { count: usize, threshold: usize },
    /// A backend could not be reached (network error or remote timeout)
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// A per-path fetch exceeded its deadline
    #[error("fetch deadline exceeded")]
    FetchTimeout,
    /// A batched store write failed
    #[error("batch write failed: {0}")]
    BatchWriteFailed(String),
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
    /// A pipeline channel was closed while still in use
    #[error("channel closed")]
    ChannelClosed,
    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::BackendUnavailable(e.to_string())
    }
}
