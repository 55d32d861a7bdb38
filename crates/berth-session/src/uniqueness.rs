//! Cluster-wide name uniqueness guard.

use berth_state::StateStore;

use crate::error::{SessionError, SessionResult};

/// Check that `name` is free for the calling namespace.
///
/// Workload and service names share one routing domain, so a name must be
/// free across every namespace, not just the caller's own. A name the
/// caller already owns passes (in-place update).
///
/// This is a pre-check, not a commit-time guarantee: two concurrent
/// creations of the same name in different namespaces can both pass before
/// either commits. The authoritative create only enforces per-namespace
/// uniqueness.
pub fn check_available(store: &StateStore, name: &str, own_namespace: &str) -> SessionResult<()> {
    for workload in store.list_workloads()? {
        if workload.name == name && workload.namespace != own_namespace {
            return Err(SessionError::NameTaken {
                name: name.to_string(),
                namespace: workload.namespace,
            });
        }
    }
    for service in store.list_services()? {
        if service.name == name && service.namespace != own_namespace {
            return Err(SessionError::NameTaken {
                name: name.to_string(),
                namespace: service.namespace,
            });
        }
    }
    Ok(())
}
