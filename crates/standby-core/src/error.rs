//! Error types for the failover orchestrator.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for orchestrator operations.
pub type FailoverResult<T> = Result<T, FailoverError>;

/// Classification of a collaborator failure.
///
/// Adapters map provider-specific responses onto these kinds so that the
/// core never inspects provider error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The named resource does not exist.
    NotFound,
    /// The resource is in a state that does not allow the operation.
    InvalidState,
    /// The call did not complete before its deadline.
    Timeout,
    /// The call never reached the provider or the connection broke.
    Transport,
    /// The provider answered with any other error.
    Rejected,
}

/// Error returned by an external collaborator.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NotFound, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidState, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Rejected, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ProviderErrorKind::Timeout,
            format!("timed out after {}ms", after.as_millis()),
        )
    }
}

/// Errors surfaced by the orchestrator and its components.
#[derive(Debug, Error)]
pub enum FailoverError {
    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("probe of {endpoint} failed: {source}")]
    Probe {
        endpoint: String,
        #[source]
        source: ProviderError,
    },

    #[error("promotion of {endpoint} failed: {source}")]
    Promotion {
        endpoint: String,
        #[source]
        source: ProviderError,
    },

    #[error("routing update for {record} failed: {source}")]
    Routing {
        record: String,
        #[source]
        source: ProviderError,
    },

    #[error("notification to {topic} failed: {source}")]
    Notification {
        topic: String,
        #[source]
        source: ProviderError,
    },

    #[error("routing weights must sum to 100, got {primary}/{replica}")]
    InvalidWeights { primary: u32, replica: u32 },

    #[error("primary {0} is not available; refusing to restore traffic")]
    PrimaryNotAvailable(String),

    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: Box<FailoverError>,
    },
}

impl FailoverError {
    /// Strip any `RetriesExhausted` wrapper and return the underlying error.
    pub fn root(&self) -> &FailoverError {
        match self {
            Self::RetriesExhausted { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration {field} = {value:?}")]
    Duration { field: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}
