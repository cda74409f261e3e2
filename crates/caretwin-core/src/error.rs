use thiserror::Error;

/// Core error types for caretwin bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Correlation key extraction failed: {0}")]
    CorrelationExtraction(String),

    #[error("Room directory lookup failed: {0}")]
    DirectoryLookup(String),

    #[error("Routing configuration error: {0}")]
    RoutingConfiguration(String),

    #[error("{operation} exceeded its budget of {budget_ms}ms")]
    Timeout { operation: String, budget_ms: u64 },

    #[error("Invalid protocol identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid twin reference: {0}")]
    InvalidTwinReference(String),

    #[error("Invalid twin lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid unit of work: {0}")]
    InvalidEnvelope(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Create a new CorrelationExtraction error
    pub fn correlation_extraction(message: impl Into<String>) -> Self {
        Self::CorrelationExtraction(message.into())
    }

    /// Create a new DirectoryLookup error
    pub fn directory_lookup(message: impl Into<String>) -> Self {
        Self::DirectoryLookup(message.into())
    }

    /// Create a new RoutingConfiguration error
    pub fn routing_configuration(message: impl Into<String>) -> Self {
        Self::RoutingConfiguration(message.into())
    }

    /// Create a new Timeout error
    pub fn timeout(operation: impl Into<String>, budget_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            budget_ms,
        }
    }

    /// Create a new InvalidIdentifier error
    pub fn invalid_identifier(identifier: impl Into<String>) -> Self {
        Self::InvalidIdentifier(identifier.into())
    }

    /// Create a new InvalidEnvelope error
    pub fn invalid_envelope(message: impl Into<String>) -> Self {
        Self::InvalidEnvelope(message.into())
    }

    /// Check if the caller may retry the failed operation.
    ///
    /// Downstream unavailability and exceeded budgets are retryable; the
    /// transport collaborator decides the actual retry/dead-letter policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DirectoryLookup(_) | Self::Timeout { .. })
    }

    /// Check if this error is a programming/configuration fault that must
    /// abort pipeline construction rather than be converted into a UoW
    /// outcome.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::RoutingConfiguration(_))
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CorrelationExtraction(_) => ErrorCategory::Correlation,
            Self::DirectoryLookup(_) => ErrorCategory::Downstream,
            Self::RoutingConfiguration(_) => ErrorCategory::Configuration,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::InvalidIdentifier(_)
            | Self::InvalidTwinReference(_)
            | Self::InvalidTransition { .. }
            | Self::InvalidEnvelope(_) => ErrorCategory::Validation,
            Self::Json(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Correlation,
    Downstream,
    Configuration,
    Timeout,
    Validation,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Correlation => write!(f, "correlation"),
            Self::Downstream => write!(f, "downstream"),
            Self::Configuration => write!(f, "configuration"),
            Self::Timeout => write!(f, "timeout"),
            Self::Validation => write!(f, "validation"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, BridgeError>;
