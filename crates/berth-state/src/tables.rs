//! redb table definitions for the Berth record store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). Namespaced records key as `{namespace}/{name}`; audit entries as
//! `{namespace}/{sequence}`.

use redb::TableDefinition;

/// Sessions keyed by session id.
pub const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Namespace records keyed by namespace name.
pub const NAMESPACES: TableDefinition<&str, &[u8]> = TableDefinition::new("namespaces");

/// Workload records keyed by `{namespace}/{name}`.
pub const WORKLOADS: TableDefinition<&str, &[u8]> = TableDefinition::new("workloads");

/// Managed-service records keyed by `{namespace}/{name}`.
pub const SERVICES: TableDefinition<&str, &[u8]> = TableDefinition::new("services");

/// Credential objects keyed by `{namespace}/{name}`.
pub const SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new("secrets");

/// Operator-facing database resources keyed by `{namespace}/{name}`.
pub const DB_RESOURCES: TableDefinition<&str, &[u8]> = TableDefinition::new("db_resources");

/// Audit entries keyed by `{namespace}/{sequence:08}`.
pub const AUDIT: TableDefinition<&str, &[u8]> = TableDefinition::new("audit");
