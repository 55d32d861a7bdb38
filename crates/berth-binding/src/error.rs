//! Service-binding error types.

use thiserror::Error;

use berth_state::{ServicePhase, VarOrigin};

/// Result type alias for binding operations.
pub type BindResult<T> = Result<T, BindError>;

/// Errors that can occur during managed-service lifecycle operations.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("workload not found: {0}")]
    WorkloadNotFound(String),

    #[error("service {service:?} is {phase:?}, not Ready; bind requires a Ready service")]
    NotReady {
        service: String,
        phase: ServicePhase,
    },

    #[error("service {service:?} is already bound to workload {workload:?}")]
    DuplicateBind { service: String, workload: String },

    #[error("service {service:?} is not bound to workload {workload:?}")]
    NotBound { service: String, workload: String },

    #[error("variable {variable:?} already provided by {origin}")]
    VarCollision { variable: String, origin: VarOrigin },

    #[error(
        "service {service:?} references credential object {found:?}, expected {expected:?}"
    )]
    CredentialConvention {
        service: String,
        found: String,
        expected: String,
    },

    #[error("service {service:?} still has bound workloads: {bound:?}")]
    DeletionGuard { service: String, bound: Vec<String> },

    #[error("optimistic retries exhausted after {attempts} attempts during {op}")]
    RetriesExhausted { op: String, attempts: u32 },

    #[error(transparent)]
    InvalidName(#[from] berth_core::NameError),

    #[error(transparent)]
    UnsupportedType(#[from] berth_core::UnsupportedType),

    #[error(transparent)]
    UnsupportedPlan(#[from] berth_core::UnsupportedPlan),

    #[error(transparent)]
    Tenancy(#[from] berth_session::SessionError),

    #[error("state store error: {0}")]
    State(#[from] berth_state::StateError),
}
