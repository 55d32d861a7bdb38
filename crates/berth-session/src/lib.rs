//! berth-session — tenant isolation for the Berth control plane.
//!
//! A session is the tenancy unit: registering one allocates an isolated
//! namespace, and every downstream operation resolves the session first.
//! This crate also hosts the cluster-wide name uniqueness guard (all
//! workloads share one routing domain) and the workload create/delete
//! entry points that compose the guard with endpoint validation.

pub mod error;
pub mod registry;
pub mod uniqueness;
pub mod workloads;

pub use error::{SessionError, SessionResult};
pub use registry::SessionRegistry;
pub use uniqueness::check_available;
pub use workloads::{create_workload, delete_workload};
