//! Tenancy error types.

use thiserror::Error;

/// Result type alias for tenancy operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur during session and workload operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    SessionNotFound(String),

    #[error("workload not found: {0}")]
    WorkloadNotFound(String),

    #[error("name {name:?} is already taken in namespace {namespace}")]
    NameTaken { name: String, namespace: String },

    #[error("duplicate plain variable {0:?} in workload environment")]
    DuplicateEnvVar(String),

    #[error(transparent)]
    InvalidName(#[from] berth_core::NameError),

    #[error(transparent)]
    Endpoint(#[from] berth_validate::ValidateError),

    #[error("state store error: {0}")]
    State(#[from] berth_state::StateError),
}
