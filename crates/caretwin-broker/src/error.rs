use thiserror::Error;

/// Errors reported by collaborator implementations.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Resource not found: {reference}")]
    NotFound { reference: String },

    #[error("Malformed collaborator response: {0}")]
    Malformed(String),
}

impl BrokerError {
    /// Create a new Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a new NotFound error
    pub fn not_found(reference: impl Into<String>) -> Self {
        Self::NotFound {
            reference: reference.into(),
        }
    }

    /// Create a new Malformed error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Whether the caller may retry against this collaborator.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
