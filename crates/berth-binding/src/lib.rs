//! berth-binding — managed-service lifecycle.
//!
//! Drives provision → status → bind → unbind → deprovision for managed
//! services. Binds inject reference-typed variables only (the credential
//! values stay in the store), deprovision is guarded while any workload
//! is still bound, and bound-list bookkeeping uses bounded optimistic
//! retries because independent bind/unbind calls against one service
//! race by design.

pub mod binding;
pub mod error;
pub mod retry;

pub use binding::{
    BINDING_VARS, BindOutcome, ServiceStatus, bind, deprovision, provision, status, unbind,
};
pub use error::{BindError, BindResult};
pub use retry::{MAX_ATTEMPTS, retry_on_conflict};
