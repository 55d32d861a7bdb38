//! StateStore — redb-backed record persistence for Berth.
//!
//! Provides typed CRUD over sessions, namespaces, workloads, managed
//! services, credential objects, database resources, and audit entries.
//! All values are JSON-serialized into redb's `&[u8]` value columns. The
//! store supports both on-disk and in-memory backends (the latter for
//! testing).
//!
//! Mutable records are version-guarded: `update_*` compares the record's
//! `resource_version` against the stored one inside the write transaction
//! and fails with [`StateError::Conflict`] on mismatch. Deleting a workload
//! or managed service garbage-collects records that carry a matching owner
//! reference in the same namespace.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

type TableDef = TableDefinition<'static, &'static str, &'static [u8]>;

/// A record whose writes are guarded by a per-object version counter.
trait Versioned: Serialize + DeserializeOwned {
    fn resource_version(&self) -> u64;
    fn set_resource_version(&mut self, version: u64);
}

macro_rules! impl_versioned {
    ($($ty:ty),+ $(,)?) => {$(
        impl Versioned for $ty {
            fn resource_version(&self) -> u64 {
                self.resource_version
            }
            fn set_resource_version(&mut self, version: u64) {
                self.resource_version = version;
            }
        }
    )+};
}

impl_versioned!(WorkloadRecord, ManagedServiceRecord, SecretRecord, DatabaseResource);

/// Thread-safe record store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent record store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "record store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory record store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory record store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(SESSIONS).map_err(map_err!(Table))?;
        txn.open_table(NAMESPACES).map_err(map_err!(Table))?;
        txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
        txn.open_table(SERVICES).map_err(map_err!(Table))?;
        txn.open_table(SECRETS).map_err(map_err!(Table))?;
        txn.open_table(DB_RESOURCES).map_err(map_err!(Table))?;
        txn.open_table(AUDIT).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic plumbing ───────────────────────────────────────────

    /// Insert a record that must not already exist; stamps version 1.
    fn create_versioned<T: Versioned>(
        &self,
        table: TableDef,
        key: &str,
        record: &mut T,
    ) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut t = txn.open_table(table).map_err(map_err!(Table))?;
            if t.get(key).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::AlreadyExists(key.to_string()));
            }
            record.set_resource_version(1);
            let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
            t.insert(key, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Compare-and-swap write: fails unless the caller's version matches
    /// the stored one; bumps the version on success.
    fn update_versioned<T: Versioned>(
        &self,
        table: TableDef,
        key: &str,
        record: &mut T,
    ) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut t = txn.open_table(table).map_err(map_err!(Table))?;
            let actual = match t.get(key).map_err(map_err!(Read))? {
                Some(guard) => serde_json::from_slice::<T>(guard.value())
                    .map_err(map_err!(Deserialize))?
                    .resource_version(),
                None => return Err(StateError::NotFound(key.to_string())),
            };
            if actual != record.resource_version() {
                return Err(StateError::Conflict {
                    key: key.to_string(),
                    expected: record.resource_version(),
                    actual,
                });
            }
            record.set_resource_version(actual + 1);
            let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
            t.insert(key, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get_record<T: DeserializeOwned>(&self, table: TableDef, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let t = txn.open_table(table).map_err(map_err!(Table))?;
        match t.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List records, optionally restricted to keys under a prefix.
    fn list_records<T: DeserializeOwned>(
        &self,
        table: TableDef,
        prefix: Option<&str>,
    ) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let t = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in t.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if prefix.is_none_or(|p| key.value().starts_with(p)) {
                let record: T =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }

    fn delete_record(&self, table: TableDef, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut t = txn.open_table(table).map_err(map_err!(Table))?;
            existed = t.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    // ── Sessions ───────────────────────────────────────────────────

    /// Insert a session. Sessions are immutable once created.
    pub fn create_session(&self, session: &SessionRecord) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut t = txn.open_table(SESSIONS).map_err(map_err!(Table))?;
            if t.get(session.id.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::AlreadyExists(session.id.clone()));
            }
            let value = serde_json::to_vec(session).map_err(map_err!(Serialize))?;
            t.insert(session.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = %session.id, namespace = %session.namespace, "session stored");
        Ok(())
    }

    /// Get a session by id.
    pub fn get_session(&self, id: &str) -> StateResult<Option<SessionRecord>> {
        self.get_record(SESSIONS, id)
    }

    // ── Namespaces ─────────────────────────────────────────────────

    /// Create the namespace record if it doesn't exist yet. Idempotent.
    pub fn ensure_namespace(&self, name: &str, created_at: u64) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut t = txn.open_table(NAMESPACES).map_err(map_err!(Table))?;
            if t.get(name).map_err(map_err!(Read))?.is_none() {
                let record = NamespaceRecord {
                    name: name.to_string(),
                    created_at,
                };
                let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
                t.insert(name, value.as_slice()).map_err(map_err!(Write))?;
                debug!(namespace = %name, "namespace created");
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get a namespace record by name.
    pub fn get_namespace(&self, name: &str) -> StateResult<Option<NamespaceRecord>> {
        self.get_record(NAMESPACES, name)
    }

    // ── Workloads ──────────────────────────────────────────────────

    pub fn create_workload(&self, workload: &mut WorkloadRecord) -> StateResult<()> {
        let key = workload.table_key();
        self.create_versioned(WORKLOADS, &key, workload)?;
        debug!(%key, "workload stored");
        Ok(())
    }

    pub fn update_workload(&self, workload: &mut WorkloadRecord) -> StateResult<()> {
        let key = workload.table_key();
        self.update_versioned(WORKLOADS, &key, workload)
    }

    pub fn get_workload(&self, namespace: &str, name: &str) -> StateResult<Option<WorkloadRecord>> {
        self.get_record(WORKLOADS, &format!("{namespace}/{name}"))
    }

    /// List workloads across all namespaces.
    pub fn list_workloads(&self) -> StateResult<Vec<WorkloadRecord>> {
        self.list_records(WORKLOADS, None)
    }

    /// List workloads in one namespace.
    pub fn list_workloads_in(&self, namespace: &str) -> StateResult<Vec<WorkloadRecord>> {
        self.list_records(WORKLOADS, Some(&format!("{namespace}/")))
    }

    /// Delete a workload and garbage-collect records it owns.
    pub fn delete_workload(&self, namespace: &str, name: &str) -> StateResult<bool> {
        let existed = self.delete_record(WORKLOADS, &format!("{namespace}/{name}"))?;
        if existed {
            self.gc_owned(namespace, OwnerKind::Workload, name);
            debug!(%namespace, %name, "workload deleted");
        }
        Ok(existed)
    }

    // ── Managed services ───────────────────────────────────────────

    pub fn create_service(&self, service: &mut ManagedServiceRecord) -> StateResult<()> {
        let key = service.table_key();
        self.create_versioned(SERVICES, &key, service)?;
        debug!(%key, "managed service stored");
        Ok(())
    }

    pub fn update_service(&self, service: &mut ManagedServiceRecord) -> StateResult<()> {
        let key = service.table_key();
        self.update_versioned(SERVICES, &key, service)
    }

    pub fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> StateResult<Option<ManagedServiceRecord>> {
        self.get_record(SERVICES, &format!("{namespace}/{name}"))
    }

    /// List managed services across all namespaces.
    pub fn list_services(&self) -> StateResult<Vec<ManagedServiceRecord>> {
        self.list_records(SERVICES, None)
    }

    /// Delete a managed service and garbage-collect records it owns.
    pub fn delete_service(&self, namespace: &str, name: &str) -> StateResult<bool> {
        let existed = self.delete_record(SERVICES, &format!("{namespace}/{name}"))?;
        if existed {
            self.gc_owned(namespace, OwnerKind::ManagedService, name);
            debug!(%namespace, %name, "managed service deleted");
        }
        Ok(existed)
    }

    // ── Credential objects ─────────────────────────────────────────

    /// Insert a credential object. Secrets are never updated in place.
    pub fn create_secret(&self, secret: &mut SecretRecord) -> StateResult<()> {
        let key = secret.table_key();
        self.create_versioned(SECRETS, &key, secret)?;
        debug!(%key, kind = secret.kind.label(), "credential object stored");
        Ok(())
    }

    pub fn get_secret(&self, namespace: &str, name: &str) -> StateResult<Option<SecretRecord>> {
        self.get_record(SECRETS, &format!("{namespace}/{name}"))
    }

    /// List credential objects in one namespace.
    pub fn list_secrets_in(&self, namespace: &str) -> StateResult<Vec<SecretRecord>> {
        self.list_records(SECRETS, Some(&format!("{namespace}/")))
    }

    pub fn delete_secret(&self, namespace: &str, name: &str) -> StateResult<bool> {
        self.delete_record(SECRETS, &format!("{namespace}/{name}"))
    }

    // ── Database resources ─────────────────────────────────────────

    pub fn create_db_resource(&self, resource: &mut DatabaseResource) -> StateResult<()> {
        let key = resource.table_key();
        self.create_versioned(DB_RESOURCES, &key, resource)?;
        debug!(%key, "database resource stored");
        Ok(())
    }

    pub fn update_db_resource(&self, resource: &mut DatabaseResource) -> StateResult<()> {
        let key = resource.table_key();
        self.update_versioned(DB_RESOURCES, &key, resource)
    }

    pub fn get_db_resource(
        &self,
        namespace: &str,
        name: &str,
    ) -> StateResult<Option<DatabaseResource>> {
        self.get_record(DB_RESOURCES, &format!("{namespace}/{name}"))
    }

    /// List database resources in one namespace.
    pub fn list_db_resources_in(&self, namespace: &str) -> StateResult<Vec<DatabaseResource>> {
        self.list_records(DB_RESOURCES, Some(&format!("{namespace}/")))
    }

    pub fn delete_db_resource(&self, namespace: &str, name: &str) -> StateResult<bool> {
        self.delete_record(DB_RESOURCES, &format!("{namespace}/{name}"))
    }

    // ── Garbage collection ─────────────────────────────────────────

    /// Delete records in `namespace` owned by the given owner. Best effort:
    /// a cascade failure is logged and must not mask the owner's deletion.
    fn gc_owned(&self, namespace: &str, kind: OwnerKind, name: &str) {
        let owns = |owner: &Option<OwnerRef>| {
            owner
                .as_ref()
                .is_some_and(|o| o.kind == kind && o.name == name)
        };

        match self.list_secrets_in(namespace) {
            Ok(secrets) => {
                for secret in secrets.iter().filter(|s| owns(&s.owner)) {
                    match self.delete_secret(namespace, &secret.name) {
                        Ok(_) => debug!(%namespace, secret = %secret.name, "garbage-collected credential copy"),
                        Err(e) => warn!(%namespace, secret = %secret.name, error = %e, "cascade delete failed"),
                    }
                }
            }
            Err(e) => warn!(%namespace, error = %e, "cascade scan of credential objects failed"),
        }

        match self.list_db_resources_in(namespace) {
            Ok(resources) => {
                for resource in resources
                    .iter()
                    .filter(|r| r.spec.owner.kind == kind && r.spec.owner.name == name)
                {
                    match self.delete_db_resource(namespace, &resource.name) {
                        Ok(_) => debug!(%namespace, resource = %resource.name, "garbage-collected database resource"),
                        Err(e) => warn!(%namespace, resource = %resource.name, error = %e, "cascade delete failed"),
                    }
                }
            }
            Err(e) => warn!(%namespace, error = %e, "cascade scan of database resources failed"),
        }
    }

    // ── Audit ──────────────────────────────────────────────────────

    /// Append an audit entry; returns its per-namespace sequence number.
    pub fn append_audit(&self, entry: &AuditEntry) -> StateResult<u64> {
        let prefix = format!("{}/", entry.namespace);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let seq;
        {
            let mut t = txn.open_table(AUDIT).map_err(map_err!(Table))?;
            seq = t
                .iter()
                .map_err(map_err!(Read))?
                .filter_map(|e| {
                    let (key, _) = e.ok()?;
                    key.value().starts_with(&prefix).then_some(())
                })
                .count() as u64;
            let key = format!("{}{seq:08}", prefix);
            let value = serde_json::to_vec(entry).map_err(map_err!(Serialize))?;
            t.insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(seq)
    }

    /// List audit entries for one namespace in sequence order.
    pub fn list_audit(&self, namespace: &str) -> StateResult<Vec<AuditEntry>> {
        self.list_records(AUDIT, Some(&format!("{namespace}/")))
    }
}
