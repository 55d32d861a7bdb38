//! Deterministic object naming.
//!
//! Every name this control plane hands to the backing store is derived
//! here, so the same inputs always produce the same object name. Copies
//! and credential references can then be found (and repaired) without
//! keeping any extra bookkeeping.

use thiserror::Error;

/// Prefix for session namespaces: `berth-<session id>`.
pub const NAMESPACE_PREFIX: &str = "berth-";

/// Reserved namespace holding the curated data-source catalog.
pub const CATALOG_NAMESPACE: &str = "berth-catalog";

/// Namespace the database operator runs in.
pub const OPERATOR_NAMESPACE: &str = "berth-db-operator";

/// Internal port the database operator probes workload pods on.
pub const HEALTH_PORT: u16 = 8181;

/// Maximum object-name length the backing store accepts.
pub const MAX_NAME_LEN: usize = 63;

/// Namespace for a session id.
pub fn session_namespace(session_id: &str) -> String {
    format!("{NAMESPACE_PREFIX}{session_id}")
}

/// Name of the credential object the database operator exposes for a
/// managed service. Fixed convention, independent of service phase.
pub fn credential_secret_name(service: &str) -> String {
    format!("{service}-app")
}

/// Name for a credential copy created by a data-source attachment.
///
/// Truncated (not hashed) at [`MAX_NAME_LEN`]; long workload/source name
/// pairs can collapse onto the same copy name. Callers treat a truncated
/// collision across different owners as an error, never an overwrite.
pub fn copy_secret_name(workload: &str, source: &str) -> String {
    truncate_name(&format!("ds-{workload}-{source}"))
}

/// Truncate a name to the store's length limit.
pub fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        name.to_string()
    } else {
        name[..MAX_NAME_LEN].to_string()
    }
}

/// Environment-variable name contributed by a credential data key:
/// uppercased, dashes folded to underscores.
pub fn env_var_name(key: &str) -> String {
    key.to_ascii_uppercase().replace('-', "_")
}

/// A caller-supplied object name the store would reject.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid name {name:?}: {reason}")]
pub struct NameError {
    pub name: String,
    pub reason: &'static str,
}

/// Validate a caller-supplied workload/service name.
///
/// Names become store keys and routing hostnames: lowercase alphanumerics
/// and dashes, starting and ending alphanumeric, at most [`MAX_NAME_LEN`]
/// characters.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    let err = |reason| {
        Err(NameError {
            name: name.to_string(),
            reason,
        })
    };
    if name.is_empty() {
        return err("must not be empty");
    }
    if name.len() > MAX_NAME_LEN {
        return err("longer than 63 characters");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return err("only lowercase alphanumerics and dashes are allowed");
    }
    if name.starts_with('-') || name.ends_with('-') {
        return err("must start and end with an alphanumeric");
    }
    Ok(())
}
