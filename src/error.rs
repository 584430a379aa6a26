//! Error types.

/// Structural input errors. Everything else degrades instead of failing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    #[error("no stops provided")]
    NoStops,

    #[error("invalid start location: {0}")]
    InvalidStartLocation(String),

    #[error("invalid stop at index {index}: {reason}")]
    InvalidStop { index: usize, reason: String },
}

/// Collaborator failures. These never escape an optimization run; each one
/// triggers the matching fallback estimate.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success code
    #[error("service error {code}: {message}")]
    Service { code: String, message: String },

    /// Response body could not be interpreted
    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("no route found")]
    NoRoute,

    /// Collaborator disabled or not configured
    #[error("{0} provider unavailable")]
    Unavailable(String),
}

/// Learner persistence and training errors.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported model record version {0}")]
    UnsupportedVersion(u32),

    #[error("{what} has {actual} values, shape requires {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("input size mismatch: expected {expected}, got {actual}")]
    InputSize { expected: usize, actual: usize },

    #[error("training set is empty")]
    EmptyTrainingSet,
}
