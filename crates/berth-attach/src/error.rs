//! Attachment error types.

use thiserror::Error;

use berth_state::VarOrigin;

/// Result type alias for attachment operations.
pub type AttachResult<T> = Result<T, AttachError>;

/// Errors that can occur while attaching or detaching a data source.
#[derive(Debug, Error)]
pub enum AttachError {
    #[error("workload not found: {0}")]
    WorkloadNotFound(String),

    #[error("unknown data source: {0}")]
    SourceNotFound(String),

    #[error("variable {variable:?} already provided by {origin}")]
    VarCollision { variable: String, origin: VarOrigin },

    #[error("data source {source_name:?} is backed by a reserved credential type ({kind}) and can never be attached")]
    ReservedKind { source_name: String, kind: &'static str },

    #[error("credential copy name {name:?} already exists and belongs to workload {owner:?}")]
    CopyNameCollision { name: String, owner: String },

    #[error("data source {source_name:?} is not attached to workload {workload:?}")]
    NotAttached { source_name: String, workload: String },

    #[error("state store error: {0}")]
    State(#[from] berth_state::StateError),
}
