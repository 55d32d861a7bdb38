//! berth-validate — endpoint validation for caller-supplied source locations.
//!
//! Workload sources (git URLs, archive endpoints) are dereferenced by a
//! privileged build step running outside the caller's namespace, so an
//! unvalidated endpoint is a server-side request forgery vector into the
//! cluster's internal network. Hosts that are — or resolve to — loopback,
//! private, or link-local ranges are rejected before anything is stored,
//! and resolution failure rejects too (fail closed).

pub mod endpoint;

pub use endpoint::{ValidateError, ValidateResult, validate_https_endpoint, validate_ssh_endpoint};
