//! berth-core — shared types for the Berth control plane.
//!
//! Holds the pieces every other crate agrees on: the closed service
//! type/plan enumerations, the immutable plan catalog, and the
//! deterministic naming rules for namespaces and credential objects.

pub mod naming;
pub mod plan;

pub use naming::{
    CATALOG_NAMESPACE, HEALTH_PORT, MAX_NAME_LEN, NAMESPACE_PREFIX, OPERATOR_NAMESPACE, NameError,
    copy_secret_name, credential_secret_name, env_var_name, session_namespace, truncate_name,
    validate_name,
};
pub use plan::{PlanEntry, ServicePlan, ServiceType, UnsupportedPlan, UnsupportedType, plan_sizing};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix timestamp in seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
