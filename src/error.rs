//! Error types for cluster configuration resolution and persistence.

use crate::validation::ValidationError;
use thiserror::Error;

/// Persisted configuration store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No configuration stored for cluster '{0}'")]
    NotFound(String),

    #[error("Configuration for cluster '{cluster}' is corrupt: {reason}")]
    Corrupt { cluster: String, reason: String },

    #[error("Configuration for cluster '{0}' changed since it was loaded; reload and retry")]
    ConcurrentModification(String),

    #[error("Join token for cluster '{0}' is already stored; clear it before saving a new one")]
    TokenImmutable(String),

    #[error("Invalid cluster name for store: '{0}'")]
    InvalidClusterName(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolution engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Cannot remove machines that are still running: {}", .0.join(", "))]
    MachineStillRunning(Vec<String>),

    #[error("Join token is already set; clear it with an empty token before setting a new one")]
    TokenImmutable,

    #[error("No machine named '{0}' in the cluster")]
    UnknownMachine(String),
}

/// Runtime identifier that is not one of docker, rkt or crio
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown container runtime '{0}' (expected docker, rkt or crio)")]
pub struct UnknownRuntime(pub String);

/// Errors surfaced to the command line
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Configuration validation failed:\n{}", format_validation(.0))]
    Invalid(Vec<ValidationError>),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
