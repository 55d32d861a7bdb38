//! Domain records persisted by the Berth record store.
//!
//! Every mutable record carries a `resource_version` the store bumps on
//! each successful write; updates supply the version they read and fail
//! on mismatch. Credential objects additionally carry an owner reference
//! used for cascading garbage collection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use berth_core::{ServicePlan, ServiceType};

// ── Session ────────────────────────────────────────────────────────

/// An isolated tenant context bound to exactly one namespace.
/// Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub display_name: String,
    pub namespace: String,
    /// Unix timestamp (seconds) when this session was registered.
    pub created_at: u64,
}

/// A namespace known to the cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamespaceRecord {
    pub name: String,
    pub created_at: u64,
}

// ── Ownership ──────────────────────────────────────────────────────

/// Kinds of records that can own other records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Workload,
    ManagedService,
}

/// Cascading-deletion back-reference: "this record is deleted automatically
/// when its owner (same namespace) is deleted". Garbage-collection wiring
/// only, not in-process ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub name: String,
}

// ── Workload ───────────────────────────────────────────────────────

/// Where a workload's code comes from. Exactly one of the three.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkloadSource {
    /// Prebuilt container image reference.
    Image { reference: String },
    /// Git endpoint plus revision, fetched by the build subsystem.
    Git { url: String, revision: String },
    /// Previously uploaded source archive.
    Archive { blob_id: String },
}

/// A plain environment variable with a literal value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// Reference-typed variable: resolved from a credential object key at
/// deploy time. This core never materializes the value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretRef {
    pub name: String,
    pub secret: String,
    pub key: String,
}

/// A data source attached to a workload: the catalog name plus the
/// namespace-local credential copy backing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachedSource {
    pub source: String,
    pub secret_name: String,
    pub var_names: Vec<String>,
}

/// A managed service bound to a workload, with the reference variables
/// the binding injected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundService {
    pub service: String,
    pub secret_name: String,
    pub vars: Vec<SecretRef>,
}

/// Lifecycle phase of a workload, written by the external build/deploy
/// subsystem. This core only observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadPhase {
    Pending,
    Building,
    Deploying,
    Running,
    Failed,
}

/// One deployable unit, owned by one namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkloadRecord {
    pub name: String,
    pub namespace: String,
    pub source: WorkloadSource,
    /// Plain variables with literal values.
    pub env: Vec<EnvVar>,
    pub attached_sources: Vec<AttachedSource>,
    pub bound_services: Vec<BoundService>,
    pub phase: WorkloadPhase,
    /// Latest build status line, written by the build subsystem.
    pub build_status: Option<String>,
    /// Latest image produced by the build subsystem.
    pub image: Option<String>,
    pub ready_replicas: u32,
    pub created_at: u64,
    pub updated_at: u64,
    pub resource_version: u64,
}

/// Where an environment-variable name on a workload came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarOrigin {
    Plain,
    DataSource(String),
    Service(String),
}

impl fmt::Display for VarOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarOrigin::Plain => write!(f, "plain environment"),
            VarOrigin::DataSource(s) => write!(f, "data source {s:?}"),
            VarOrigin::Service(s) => write!(f, "service binding {s:?}"),
        }
    }
}

impl WorkloadRecord {
    /// Build the composite key for the workloads table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Origin of a variable name already present on this workload, if any.
    /// Invariant: the union of plain, attached, and bound names is
    /// duplicate-free, so the first match is the only one.
    pub fn var_origin(&self, name: &str) -> Option<VarOrigin> {
        if self.env.iter().any(|v| v.name == name) {
            return Some(VarOrigin::Plain);
        }
        for attached in &self.attached_sources {
            if attached.var_names.iter().any(|v| v == name) {
                return Some(VarOrigin::DataSource(attached.source.clone()));
            }
        }
        for bound in &self.bound_services {
            if bound.vars.iter().any(|v| v.name == name) {
                return Some(VarOrigin::Service(bound.service.clone()));
            }
        }
        None
    }
}

// ── Managed service ────────────────────────────────────────────────

/// Lifecycle phase of a managed service, driven by the database
/// operator's reported conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePhase {
    Provisioning,
    Ready,
    Failed,
    Deleting,
}

/// One platform-provisioned backing resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManagedServiceRecord {
    pub name: String,
    pub namespace: String,
    pub service_type: ServiceType,
    pub plan: ServicePlan,
    pub phase: ServicePhase,
    /// Deterministic credential-object name: `<name>-app`.
    pub credential_secret: String,
    /// Workloads currently bound to this service. Deletion is blocked
    /// while non-empty.
    pub bound_workloads: Vec<String>,
    pub created_at: u64,
    pub resource_version: u64,
}

impl ManagedServiceRecord {
    /// Build the composite key for the services table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

// ── Credential objects ─────────────────────────────────────────────

/// Closed union of credential-object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    BasicAuth,
    SshKey,
    Opaque,
    /// Platform identity token. Reserved: never attachable.
    ServiceAccountToken,
    /// Registry pull credentials. Reserved: never attachable.
    RegistryAuth,
}

impl SecretKind {
    /// Allow-list for cross-namespace copies. Reserved platform kinds are
    /// rejected by tag, not by heuristic.
    pub fn copyable(&self) -> bool {
        matches!(
            self,
            SecretKind::BasicAuth | SecretKind::SshKey | SecretKind::Opaque
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            SecretKind::BasicAuth => "basic-auth",
            SecretKind::SshKey => "ssh-key",
            SecretKind::Opaque => "opaque",
            SecretKind::ServiceAccountToken => "service-account-token",
            SecretKind::RegistryAuth => "registry-auth",
        }
    }
}

/// An opaque, namespace-scoped key-value credential object.
///
/// Never mutated after creation. `Debug` redacts values so secret material
/// cannot leak through logs or error context.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SecretRecord {
    pub name: String,
    pub namespace: String,
    pub kind: SecretKind,
    pub data: BTreeMap<String, String>,
    pub owner: Option<OwnerRef>,
    pub resource_version: u64,
}

impl SecretRecord {
    /// Build the composite key for the secrets table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("kind", &self.kind)
            .field("data", &format_args!("<{} redacted keys>", self.data.len()))
            .field("owner", &self.owner)
            .field("resource_version", &self.resource_version)
            .finish()
    }
}

// ── Database resource ──────────────────────────────────────────────

/// Desired state handed to the database operator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseManifest {
    pub instances: u32,
    pub cpu: String,
    pub memory: String,
    pub storage: String,
    pub owner: OwnerRef,
    pub network_policy: NetworkPolicy,
}

/// Namespace-scoped ingress allow-list for a database resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkPolicy {
    pub namespace: String,
    pub ingress: Vec<IngressRule>,
}

/// One permitted ingress path. `port: None` permits all ports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngressRule {
    pub from_namespace: String,
    pub port: Option<u16>,
}

/// Condition truth value as reported by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// One operator-reported condition on a database resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub kind: String,
    pub status: ConditionStatus,
    pub message: Option<String>,
}

/// The operator-facing resource: our manifest plus the condition list the
/// operator writes back. Owner-referenced to its managed service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseResource {
    pub name: String,
    pub namespace: String,
    pub spec: DatabaseManifest,
    pub conditions: Vec<Condition>,
    pub resource_version: u64,
}

impl DatabaseResource {
    /// Build the composite key for the db_resources table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

// ── Audit ──────────────────────────────────────────────────────────

/// Record of a privileged cross-namespace credential copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub session: String,
    pub namespace: String,
    pub workload: String,
    pub source: String,
    /// Unix timestamp (seconds).
    pub at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workload_with_vars() -> WorkloadRecord {
        WorkloadRecord {
            name: "web".into(),
            namespace: "berth-x".into(),
            source: WorkloadSource::Image {
                reference: "registry.example.com/web:v1".into(),
            },
            env: vec![EnvVar {
                name: "LOG_LEVEL".into(),
                value: "debug".into(),
            }],
            attached_sources: vec![AttachedSource {
                source: "api-keys".into(),
                secret_name: "ds-web-api-keys".into(),
                var_names: vec!["API_TOKEN".into()],
            }],
            bound_services: vec![BoundService {
                service: "mydb".into(),
                secret_name: "mydb-app".into(),
                vars: vec![SecretRef {
                    name: "DATABASE_URL".into(),
                    secret: "mydb-app".into(),
                    key: "uri".into(),
                }],
            }],
            phase: WorkloadPhase::Pending,
            build_status: None,
            image: None,
            ready_replicas: 0,
            created_at: 1000,
            updated_at: 1000,
            resource_version: 1,
        }
    }

    #[test]
    fn var_origin_covers_all_three_sources() {
        let w = workload_with_vars();
        assert_eq!(w.var_origin("LOG_LEVEL"), Some(VarOrigin::Plain));
        assert_eq!(
            w.var_origin("API_TOKEN"),
            Some(VarOrigin::DataSource("api-keys".into()))
        );
        assert_eq!(
            w.var_origin("DATABASE_URL"),
            Some(VarOrigin::Service("mydb".into()))
        );
        assert_eq!(w.var_origin("MISSING"), None);
    }

    #[test]
    fn var_origin_display_names_the_origin() {
        assert_eq!(
            VarOrigin::DataSource("api-keys".into()).to_string(),
            "data source \"api-keys\""
        );
    }

    #[test]
    fn secret_debug_redacts_values() {
        let secret = SecretRecord {
            name: "creds".into(),
            namespace: "berth-x".into(),
            kind: SecretKind::BasicAuth,
            data: BTreeMap::from([("password".into(), "hunter2".into())]),
            owner: None,
            resource_version: 1,
        };
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn reserved_kinds_are_not_copyable() {
        assert!(SecretKind::BasicAuth.copyable());
        assert!(SecretKind::SshKey.copyable());
        assert!(SecretKind::Opaque.copyable());
        assert!(!SecretKind::ServiceAccountToken.copyable());
        assert!(!SecretKind::RegistryAuth.copyable());
    }

    #[test]
    fn workload_source_is_tagged() {
        let git = WorkloadSource::Git {
            url: "https://github.com/org/repo".into(),
            revision: "main".into(),
        };
        let json = serde_json::to_string(&git).unwrap();
        assert!(json.contains("\"type\":\"git\""));
    }
}
