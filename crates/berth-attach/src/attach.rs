//! The attach/detach operations.

use tracing::{info, warn};

use berth_core::{copy_secret_name, now_unix};
use berth_state::{
    AttachedSource, AuditEntry, OwnerKind, OwnerRef, SecretRecord, SessionRecord, StateStore,
};

use crate::catalog::{contributed_vars, lookup_source};
use crate::error::{AttachError, AttachResult};

/// What a successful attach reports back: variable names only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachOutcome {
    pub workload: String,
    pub source: String,
    pub var_names: Vec<String>,
    /// True when the source was already attached and nothing was copied.
    pub already_attached: bool,
}

/// Attach a curated data source to a workload.
///
/// Re-attaching an already-attached source is idempotent: the same
/// payload comes back and nothing is re-copied. A variable collision or a
/// reserved credential kind rejects before anything is created.
pub fn attach(
    store: &StateStore,
    session: &SessionRecord,
    workload_name: &str,
    source_name: &str,
) -> AttachResult<AttachOutcome> {
    let mut workload = store
        .get_workload(&session.namespace, workload_name)?
        .ok_or_else(|| AttachError::WorkloadNotFound(workload_name.to_string()))?;
    let entry = lookup_source(store, source_name)?;
    let var_names = contributed_vars(&entry);

    // Idempotent re-attach: same payload, no second copy.
    if let Some(existing) = workload
        .attached_sources
        .iter()
        .find(|a| a.source == source_name)
    {
        return Ok(AttachOutcome {
            workload: workload_name.to_string(),
            source: source_name.to_string(),
            var_names: existing.var_names.clone(),
            already_attached: true,
        });
    }

    for name in &var_names {
        if let Some(origin) = workload.var_origin(name) {
            return Err(AttachError::VarCollision {
                variable: name.clone(),
                origin,
            });
        }
    }

    if !entry.kind.copyable() {
        return Err(AttachError::ReservedKind {
            source_name: source_name.to_string(),
            kind: entry.kind.label(),
        });
    }

    let copy = ensure_copy(store, session, workload_name, &entry)?;

    workload.attached_sources.push(AttachedSource {
        source: source_name.to_string(),
        secret_name: copy.name.clone(),
        var_names: var_names.clone(),
    });
    workload.updated_at = now_unix();
    if let Err(err) = store.update_workload(&mut workload) {
        // Roll back the copy we just created; a pre-existing one stays.
        // Cleanup failure must not mask the original error.
        if copy.created {
            if let Err(cleanup) = store.delete_secret(&session.namespace, &copy.name) {
                warn!(
                    namespace = %session.namespace,
                    secret = %copy.name,
                    error = %cleanup,
                    "cleanup of credential copy failed"
                );
            }
        }
        return Err(err.into());
    }

    let audit = AuditEntry {
        session: session.id.clone(),
        namespace: session.namespace.clone(),
        workload: workload_name.to_string(),
        source: source_name.to_string(),
        at: now_unix(),
    };
    store.append_audit(&audit)?;
    info!(
        target: "audit",
        session = %session.id,
        namespace = %session.namespace,
        workload = %workload_name,
        source = %source_name,
        "data source attached"
    );

    Ok(AttachOutcome {
        workload: workload_name.to_string(),
        source: source_name.to_string(),
        var_names,
        already_attached: false,
    })
}

struct CopyHandle {
    name: String,
    created: bool,
}

/// Copy the catalog entry into the session namespace under its
/// deterministic name. A pre-existing copy owned by this workload is a
/// partial prior attempt and is reused; one owned by anything else is a
/// truncation collision and an error.
fn ensure_copy(
    store: &StateStore,
    session: &SessionRecord,
    workload_name: &str,
    entry: &SecretRecord,
) -> AttachResult<CopyHandle> {
    let name = copy_secret_name(workload_name, &entry.name);

    if let Some(existing) = store.get_secret(&session.namespace, &name)? {
        let owned_by_us = existing
            .owner
            .as_ref()
            .is_some_and(|o| o.kind == OwnerKind::Workload && o.name == workload_name);
        if owned_by_us {
            return Ok(CopyHandle { name, created: false });
        }
        return Err(AttachError::CopyNameCollision {
            owner: existing
                .owner
                .map(|o| o.name)
                .unwrap_or_else(|| "<none>".to_string()),
            name,
        });
    }

    let mut copy = SecretRecord {
        name: name.clone(),
        namespace: session.namespace.clone(),
        kind: entry.kind,
        data: entry.data.clone(),
        owner: Some(OwnerRef {
            kind: OwnerKind::Workload,
            name: workload_name.to_string(),
        }),
        resource_version: 0,
    };
    store.create_secret(&mut copy)?;
    Ok(CopyHandle { name, created: true })
}

/// Detach a data source: drop the attachment record and best-effort
/// delete the credential copy.
pub fn detach(
    store: &StateStore,
    session: &SessionRecord,
    workload_name: &str,
    source_name: &str,
) -> AttachResult<()> {
    let mut workload = store
        .get_workload(&session.namespace, workload_name)?
        .ok_or_else(|| AttachError::WorkloadNotFound(workload_name.to_string()))?;

    let Some(index) = workload
        .attached_sources
        .iter()
        .position(|a| a.source == source_name)
    else {
        return Err(AttachError::NotAttached {
            source_name: source_name.to_string(),
            workload: workload_name.to_string(),
        });
    };

    let removed = workload.attached_sources.remove(index);
    workload.updated_at = now_unix();
    store.update_workload(&mut workload)?;

    if let Err(e) = store.delete_secret(&session.namespace, &removed.secret_name) {
        warn!(
            namespace = %session.namespace,
            secret = %removed.secret_name,
            error = %e,
            "deleting detached credential copy failed"
        );
    }

    info!(
        namespace = %session.namespace,
        workload = %workload_name,
        source = %source_name,
        "data source detached"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use berth_core::CATALOG_NAMESPACE;
    use berth_state::{
        EnvVar, SecretKind, WorkloadPhase, WorkloadRecord, WorkloadSource,
    };

    fn session() -> SessionRecord {
        SessionRecord {
            id: "s1".to_string(),
            display_name: "demo".to_string(),
            namespace: "berth-s1".to_string(),
            created_at: 1000,
        }
    }

    fn seed_workload(store: &StateStore, name: &str, env: Vec<EnvVar>) {
        let mut w = WorkloadRecord {
            name: name.to_string(),
            namespace: "berth-s1".to_string(),
            source: WorkloadSource::Image {
                reference: "registry.example.com/app:v1".to_string(),
            },
            env,
            attached_sources: Vec::new(),
            bound_services: Vec::new(),
            phase: WorkloadPhase::Pending,
            build_status: None,
            image: None,
            ready_replicas: 0,
            created_at: 1000,
            updated_at: 1000,
            resource_version: 0,
        };
        store.create_workload(&mut w).unwrap();
    }

    fn seed_source(store: &StateStore, name: &str, kind: SecretKind, keys: &[&str]) {
        let mut secret = SecretRecord {
            name: name.to_string(),
            namespace: CATALOG_NAMESPACE.to_string(),
            kind,
            data: keys
                .iter()
                .map(|k| (k.to_string(), "secret-value".to_string()))
                .collect::<BTreeMap<_, _>>(),
            owner: None,
            resource_version: 0,
        };
        store.create_secret(&mut secret).unwrap();
    }

    fn setup() -> (StateStore, SessionRecord) {
        let store = StateStore::open_in_memory().unwrap();
        seed_workload(&store, "web", Vec::new());
        seed_source(&store, "api-keys", SecretKind::Opaque, &["api-token"]);
        (store, session())
    }

    #[test]
    fn attach_copies_and_records() {
        let (store, s) = setup();

        let outcome = attach(&store, &s, "web", "api-keys").unwrap();
        assert_eq!(outcome.var_names, vec!["API_TOKEN".to_string()]);
        assert!(!outcome.already_attached);

        let copy = store.get_secret("berth-s1", "ds-web-api-keys").unwrap().unwrap();
        assert_eq!(copy.kind, SecretKind::Opaque);
        assert_eq!(
            copy.owner,
            Some(OwnerRef {
                kind: OwnerKind::Workload,
                name: "web".to_string()
            })
        );

        let w = store.get_workload("berth-s1", "web").unwrap().unwrap();
        assert_eq!(w.attached_sources.len(), 1);
        assert_eq!(w.attached_sources[0].secret_name, "ds-web-api-keys");
    }

    #[test]
    fn reattach_is_idempotent() {
        let (store, s) = setup();

        let first = attach(&store, &s, "web", "api-keys").unwrap();
        let second = attach(&store, &s, "web", "api-keys").unwrap();

        assert!(second.already_attached);
        assert_eq!(first.var_names, second.var_names);

        let w = store.get_workload("berth-s1", "web").unwrap().unwrap();
        assert_eq!(w.attached_sources.len(), 1);
        assert_eq!(store.list_secrets_in("berth-s1").unwrap().len(), 1);
        // Only the first attach is audited.
        assert_eq!(store.list_audit("berth-s1").unwrap().len(), 1);
    }

    #[test]
    fn collision_with_plain_var_names_variable_and_origin() {
        let store = StateStore::open_in_memory().unwrap();
        seed_workload(
            &store,
            "web",
            vec![EnvVar {
                name: "API_TOKEN".to_string(),
                value: "literal".to_string(),
            }],
        );
        seed_source(&store, "api-keys", SecretKind::Opaque, &["api-token"]);

        let err = attach(&store, &session(), "web", "api-keys").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("API_TOKEN"));
        assert!(msg.contains("plain environment"));

        // Attachment list unchanged, nothing copied.
        let w = store.get_workload("berth-s1", "web").unwrap().unwrap();
        assert!(w.attached_sources.is_empty());
        assert!(store.list_secrets_in("berth-s1").unwrap().is_empty());
    }

    #[test]
    fn collision_with_another_source_names_it() {
        let (store, s) = setup();
        seed_source(&store, "other-keys", SecretKind::Opaque, &["api-token"]);

        attach(&store, &s, "web", "api-keys").unwrap();
        let err = attach(&store, &s, "web", "other-keys").unwrap_err();
        match err {
            AttachError::VarCollision { variable, origin } => {
                assert_eq!(variable, "API_TOKEN");
                assert_eq!(origin.to_string(), "data source \"api-keys\"");
            }
            other => panic!("expected VarCollision, got {other:?}"),
        }
    }

    #[test]
    fn reserved_kinds_are_rejected_by_tag() {
        let (store, s) = setup();
        seed_source(&store, "identity", SecretKind::ServiceAccountToken, &["token"]);
        seed_source(&store, "pull-creds", SecretKind::RegistryAuth, &["auth"]);

        for source in ["identity", "pull-creds"] {
            let err = attach(&store, &s, "web", source).unwrap_err();
            assert!(matches!(err, AttachError::ReservedKind { .. }), "{source}");
        }
        assert!(store.list_secrets_in("berth-s1").unwrap().is_empty());
    }

    #[test]
    fn partial_prior_attempt_is_repaired_not_recreated() {
        let (store, s) = setup();

        // Simulate a crash after the copy landed but before the record did.
        let mut orphan = SecretRecord {
            name: "ds-web-api-keys".to_string(),
            namespace: "berth-s1".to_string(),
            kind: SecretKind::Opaque,
            data: BTreeMap::from([("api-token".to_string(), "secret-value".to_string())]),
            owner: Some(OwnerRef {
                kind: OwnerKind::Workload,
                name: "web".to_string(),
            }),
            resource_version: 0,
        };
        store.create_secret(&mut orphan).unwrap();

        let outcome = attach(&store, &s, "web", "api-keys").unwrap();
        assert!(!outcome.already_attached);
        // Still exactly one copy.
        assert_eq!(store.list_secrets_in("berth-s1").unwrap().len(), 1);
    }

    #[test]
    fn truncation_collision_with_foreign_owner_is_an_error() {
        let (store, s) = setup();

        let mut foreign = SecretRecord {
            name: "ds-web-api-keys".to_string(),
            namespace: "berth-s1".to_string(),
            kind: SecretKind::Opaque,
            data: BTreeMap::new(),
            owner: Some(OwnerRef {
                kind: OwnerKind::Workload,
                name: "other".to_string(),
            }),
            resource_version: 0,
        };
        store.create_secret(&mut foreign).unwrap();

        let err = attach(&store, &s, "web", "api-keys").unwrap_err();
        match err {
            AttachError::CopyNameCollision { owner, .. } => assert_eq!(owner, "other"),
            other => panic!("expected CopyNameCollision, got {other:?}"),
        }
    }

    #[test]
    fn attach_audits_the_copy() {
        let (store, s) = setup();
        attach(&store, &s, "web", "api-keys").unwrap();

        let audit = store.list_audit("berth-s1").unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].session, "s1");
        assert_eq!(audit[0].workload, "web");
        assert_eq!(audit[0].source, "api-keys");
    }

    #[test]
    fn outcome_never_contains_values() {
        let (store, s) = setup();
        let outcome = attach(&store, &s, "web", "api-keys").unwrap();
        let rendered = format!("{outcome:?}");
        assert!(!rendered.contains("secret-value"));
    }

    #[test]
    fn detach_removes_record_and_copy() {
        let (store, s) = setup();
        attach(&store, &s, "web", "api-keys").unwrap();

        detach(&store, &s, "web", "api-keys").unwrap();
        let w = store.get_workload("berth-s1", "web").unwrap().unwrap();
        assert!(w.attached_sources.is_empty());
        assert!(store.get_secret("berth-s1", "ds-web-api-keys").unwrap().is_none());

        let err = detach(&store, &s, "web", "api-keys").unwrap_err();
        assert!(matches!(err, AttachError::NotAttached { .. }));
    }

    #[test]
    fn unknown_workload_and_source_are_distinct_errors() {
        let (store, s) = setup();

        assert!(matches!(
            attach(&store, &s, "ghost", "api-keys").unwrap_err(),
            AttachError::WorkloadNotFound(_)
        ));
        assert!(matches!(
            attach(&store, &s, "web", "ghost").unwrap_err(),
            AttachError::SourceNotFound(_)
        ));
    }
}
