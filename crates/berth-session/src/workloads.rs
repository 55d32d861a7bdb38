//! Workload create/delete entry points.
//!
//! Creation composes name validation, endpoint validation (git sources are
//! dereferenced by the privileged build step), and the cluster-wide name
//! guard before the record is committed. Deletion cascades to owned
//! credential copies through the store's garbage collection.

use tracing::info;

use berth_core::{now_unix, validate_name};
use berth_state::{
    EnvVar, SessionRecord, StateStore, WorkloadPhase, WorkloadRecord, WorkloadSource,
};
use berth_validate::{validate_https_endpoint, validate_ssh_endpoint};

use crate::error::{SessionError, SessionResult};
use crate::uniqueness::check_available;

/// Create a workload record in the session's namespace, phase Pending.
/// The build/deploy subsystem picks it up from there; this core never
/// writes the build-owned fields.
pub fn create_workload(
    store: &StateStore,
    session: &SessionRecord,
    name: &str,
    source: WorkloadSource,
    env: Vec<EnvVar>,
) -> SessionResult<WorkloadRecord> {
    validate_name(name)?;
    validate_source(&source)?;

    // Plain variables must be duplicate-free on their own before the
    // attach/bind collision checks build on top of them.
    for (i, var) in env.iter().enumerate() {
        if env[..i].iter().any(|other| other.name == var.name) {
            return Err(SessionError::DuplicateEnvVar(var.name.clone()));
        }
    }

    check_available(store, name, &session.namespace)?;

    let now = now_unix();
    let mut workload = WorkloadRecord {
        name: name.to_string(),
        namespace: session.namespace.clone(),
        source,
        env,
        attached_sources: Vec::new(),
        bound_services: Vec::new(),
        phase: WorkloadPhase::Pending,
        build_status: None,
        image: None,
        ready_replicas: 0,
        created_at: now,
        updated_at: now,
        resource_version: 0,
    };
    store.create_workload(&mut workload)?;

    info!(namespace = %session.namespace, workload = %name, "workload created");
    Ok(workload)
}

/// Delete a workload owned by the session. Owned credential copies are
/// garbage-collected by the store.
pub fn delete_workload(store: &StateStore, session: &SessionRecord, name: &str) -> SessionResult<()> {
    if !store.delete_workload(&session.namespace, name)? {
        return Err(SessionError::WorkloadNotFound(name.to_string()));
    }
    info!(namespace = %session.namespace, workload = %name, "workload deleted");
    Ok(())
}

/// Git sources carry caller-controlled endpoints; validate before storing.
fn validate_source(source: &WorkloadSource) -> SessionResult<()> {
    match source {
        WorkloadSource::Git { url, .. } => {
            if url.contains("://") {
                validate_https_endpoint(url)?;
            } else {
                validate_ssh_endpoint(url)?;
            }
            Ok(())
        }
        // Image references and uploaded archives are resolved inside the
        // platform, not fetched from caller-controlled endpoints.
        WorkloadSource::Image { .. } | WorkloadSource::Archive { .. } => Ok(()),
    }
}
