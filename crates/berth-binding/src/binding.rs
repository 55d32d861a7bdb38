//! The managed-service lifecycle operations.

use tracing::{debug, info, warn};

use berth_core::{
    ServicePlan, ServiceType, credential_secret_name, now_unix, validate_name,
};
use berth_database::{build_manifest, read_status};
use berth_session::check_available;
use berth_state::{
    BoundService, DatabaseResource, ManagedServiceRecord, SecretRef, ServicePhase, SessionRecord,
    StateError, StateStore,
};

use crate::error::{BindError, BindResult};
use crate::retry::retry_on_conflict;

/// The variables a bind injects, with the credential key each resolves to.
/// One full connection string plus the discrete parts.
pub const BINDING_VARS: [(&str, &str); 6] = [
    ("DATABASE_URL", "uri"),
    ("DATABASE_HOST", "host"),
    ("DATABASE_PORT", "port"),
    ("DATABASE_NAME", "database"),
    ("DATABASE_USERNAME", "username"),
    ("DATABASE_PASSWORD", "password"),
];

/// Caller-facing status payload. The variable list is present only when
/// the service is Ready; the credential reference never appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub name: String,
    pub service_type: ServiceType,
    pub plan: ServicePlan,
    pub phase: ServicePhase,
    pub var_names: Option<Vec<String>>,
}

/// What a successful bind reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    pub service: String,
    pub workload: String,
    pub var_names: Vec<String>,
}

fn binding_var_names() -> Vec<String> {
    BINDING_VARS.iter().map(|(name, _)| name.to_string()).collect()
}

fn resolve_service(
    store: &StateStore,
    namespace: &str,
    name: &str,
) -> BindResult<ManagedServiceRecord> {
    store
        .get_service(namespace, name)?
        .ok_or_else(|| BindError::ServiceNotFound(name.to_string()))
}

/// Create a managed service in Provisioning and hand its manifest to the
/// operator. Returns immediately; provisioning itself is asynchronous and
/// reconciled later through `status`.
pub fn provision(
    store: &StateStore,
    session: &SessionRecord,
    name: &str,
    type_name: &str,
    plan_name: &str,
) -> BindResult<ManagedServiceRecord> {
    validate_name(name)?;
    let service_type: ServiceType = type_name.parse()?;
    let plan: ServicePlan = plan_name.parse()?;
    check_available(store, name, &session.namespace)?;

    let now = now_unix();
    let mut service = ManagedServiceRecord {
        name: name.to_string(),
        namespace: session.namespace.clone(),
        service_type,
        plan,
        phase: ServicePhase::Provisioning,
        credential_secret: credential_secret_name(name),
        bound_workloads: Vec::new(),
        created_at: now,
        resource_version: 0,
    };
    store.create_service(&mut service)?;

    let mut resource = DatabaseResource {
        name: name.to_string(),
        namespace: session.namespace.clone(),
        spec: build_manifest(&service),
        conditions: Vec::new(),
        resource_version: 0,
    };
    if let Err(err) = store.create_db_resource(&mut resource) {
        // Roll back the record we just created; never a pre-existing one.
        if let Err(cleanup) = store.delete_service(&session.namespace, name) {
            warn!(namespace = %session.namespace, service = %name, error = %cleanup,
                "cleanup of managed-service record failed");
        }
        return Err(err.into());
    }

    info!(namespace = %session.namespace, service = %name,
        service_type = service_type.label(), plan = plan.label(), "managed service provisioning");
    Ok(service)
}

/// Report a service's phase, reconciling it from the operator's
/// conditions. Only a Ready service advertises the variable names a bind
/// would inject.
pub fn status(store: &StateStore, session: &SessionRecord, name: &str) -> BindResult<ServiceStatus> {
    let mut service = resolve_service(store, &session.namespace, name)?;

    if let Some(resource) = store.get_db_resource(&session.namespace, name)? {
        let report = read_status(&resource);
        if report.phase != service.phase {
            let namespace = session.namespace.clone();
            service = retry_on_conflict("record service phase", || {
                let mut current = store
                    .get_service(&namespace, name)?
                    .ok_or_else(|| StateError::NotFound(format!("{namespace}/{name}")))?;
                current.phase = report.phase;
                store.update_service(&mut current)?;
                Ok(current)
            })?;
            debug!(namespace = %session.namespace, service = %name, phase = ?service.phase,
                "service phase recorded");
        }
    }

    let var_names = (service.phase == ServicePhase::Ready).then(binding_var_names);
    Ok(ServiceStatus {
        name: service.name,
        service_type: service.service_type,
        plan: service.plan,
        phase: service.phase,
        var_names,
    })
}

/// Bind a Ready service to a workload: inject the six reference-typed
/// variables and append the workload to the service's bound list.
///
/// Duplicate bind is an explicit error, unlike the idempotent data-source
/// attach: re-binding would re-inject variables the workload already has.
pub fn bind(
    store: &StateStore,
    session: &SessionRecord,
    service_name: &str,
    workload_name: &str,
) -> BindResult<BindOutcome> {
    let service = resolve_service(store, &session.namespace, service_name)?;
    let mut workload = store
        .get_workload(&session.namespace, workload_name)?
        .ok_or_else(|| BindError::WorkloadNotFound(workload_name.to_string()))?;

    if service.phase != ServicePhase::Ready {
        return Err(BindError::NotReady {
            service: service_name.to_string(),
            phase: service.phase,
        });
    }

    // Defensive: the credential reference is fixed by convention; a record
    // that disagrees was tampered with or corrupted.
    let expected = credential_secret_name(service_name);
    if service.credential_secret != expected {
        return Err(BindError::CredentialConvention {
            service: service_name.to_string(),
            found: service.credential_secret,
            expected,
        });
    }

    if workload.bound_services.iter().any(|b| b.service == service_name)
        || service.bound_workloads.iter().any(|w| w == workload_name)
    {
        return Err(BindError::DuplicateBind {
            service: service_name.to_string(),
            workload: workload_name.to_string(),
        });
    }

    for (var, _) in BINDING_VARS {
        if let Some(origin) = workload.var_origin(var) {
            return Err(BindError::VarCollision {
                variable: var.to_string(),
                origin,
            });
        }
    }

    workload.bound_services.push(BoundService {
        service: service_name.to_string(),
        secret_name: expected.clone(),
        vars: BINDING_VARS
            .iter()
            .map(|(var, key)| SecretRef {
                name: var.to_string(),
                secret: expected.clone(),
                key: key.to_string(),
            })
            .collect(),
    });
    workload.updated_at = now_unix();
    store.update_workload(&mut workload)?;

    let namespace = session.namespace.clone();
    let appended = retry_on_conflict("append bound workload", || {
        let mut current = store
            .get_service(&namespace, service_name)?
            .ok_or_else(|| StateError::NotFound(format!("{namespace}/{service_name}")))?;
        if !current.bound_workloads.iter().any(|w| w == workload_name) {
            current.bound_workloads.push(workload_name.to_string());
            store.update_service(&mut current)?;
        }
        Ok(())
    });
    if let Err(err) = appended {
        // Revert the workload-side variables, best effort; the original
        // error is what surfaces.
        match store.get_workload(&session.namespace, workload_name) {
            Ok(Some(mut current)) => {
                current.bound_services.retain(|b| b.service != service_name);
                if let Err(revert) = store.update_workload(&mut current) {
                    warn!(namespace = %session.namespace, workload = %workload_name,
                        error = %revert, "reverting bind variables failed");
                }
            }
            _ => warn!(namespace = %session.namespace, workload = %workload_name,
                "reverting bind variables failed: workload unreadable"),
        }
        return Err(err);
    }

    info!(namespace = %session.namespace, service = %service_name, workload = %workload_name,
        "service bound");
    Ok(BindOutcome {
        service: service_name.to_string(),
        workload: workload_name.to_string(),
        var_names: binding_var_names(),
    })
}

/// Remove exactly the variables a binding added and take the workload off
/// the service's bound list. Plain variables are untouched.
pub fn unbind(
    store: &StateStore,
    session: &SessionRecord,
    service_name: &str,
    workload_name: &str,
) -> BindResult<()> {
    resolve_service(store, &session.namespace, service_name)?;
    let mut workload = store
        .get_workload(&session.namespace, workload_name)?
        .ok_or_else(|| BindError::WorkloadNotFound(workload_name.to_string()))?;

    let Some(index) = workload
        .bound_services
        .iter()
        .position(|b| b.service == service_name)
    else {
        return Err(BindError::NotBound {
            service: service_name.to_string(),
            workload: workload_name.to_string(),
        });
    };
    workload.bound_services.remove(index);
    workload.updated_at = now_unix();
    store.update_workload(&mut workload)?;

    let namespace = session.namespace.clone();
    retry_on_conflict("remove bound workload", || {
        let mut current = store
            .get_service(&namespace, service_name)?
            .ok_or_else(|| StateError::NotFound(format!("{namespace}/{service_name}")))?;
        if let Some(i) = current.bound_workloads.iter().position(|w| w == workload_name) {
            current.bound_workloads.remove(i);
            store.update_service(&mut current)?;
        }
        Ok(())
    })?;

    info!(namespace = %session.namespace, service = %service_name, workload = %workload_name,
        "service unbound");
    Ok(())
}

/// Delete a managed service. Rejected while any workload is still bound;
/// the underlying resource and credential object cascade via ownership.
pub fn deprovision(store: &StateStore, session: &SessionRecord, name: &str) -> BindResult<()> {
    let mut service = resolve_service(store, &session.namespace, name)?;
    if !service.bound_workloads.is_empty() {
        return Err(BindError::DeletionGuard {
            service: name.to_string(),
            bound: service.bound_workloads,
        });
    }

    // Record Deleting so concurrent status readers see the teardown; a
    // conflict here is harmless, the delete below is authoritative.
    service.phase = ServicePhase::Deleting;
    if let Err(e) = store.update_service(&mut service) {
        debug!(namespace = %session.namespace, service = %name, error = %e,
            "deleting-phase update lost");
    }

    store.delete_service(&session.namespace, name)?;
    info!(namespace = %session.namespace, service = %name, "managed service deprovisioned");
    Ok(())
}
