//! Session registry — one namespace per session.

use tracing::info;
use uuid::Uuid;

use berth_core::{now_unix, session_namespace};
use berth_state::{SecretKind, SecretRecord, SessionRecord, StateError, StateStore};

use crate::error::{SessionError, SessionResult};

/// Name of the identity object bootstrapped into every session namespace.
const DEFAULT_IDENTITY: &str = "default-identity";

/// Issues and resolves sessions. Stateless over the record store, so it is
/// cheap to construct wherever needed.
#[derive(Clone)]
pub struct SessionRegistry {
    store: StateStore,
}

impl SessionRegistry {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    /// Register a new session: allocate an id, derive its namespace, and
    /// idempotently ensure the namespace and default identity exist.
    pub fn register(&self, display_name: &str) -> SessionResult<SessionRecord> {
        let id = Uuid::new_v4().simple().to_string();
        let namespace = session_namespace(&id);
        let created_at = now_unix();

        self.store.ensure_namespace(&namespace, created_at)?;
        self.ensure_default_identity(&namespace)?;

        let session = SessionRecord {
            id: id.clone(),
            display_name: display_name.to_string(),
            namespace: namespace.clone(),
            created_at,
        };
        self.store.create_session(&session)?;

        info!(session = %id, %namespace, "session registered");
        Ok(session)
    }

    /// Resolve a session id. Failure here is a precondition error for every
    /// downstream call.
    pub fn lookup(&self, id: &str) -> SessionResult<SessionRecord> {
        self.store
            .get_session(id)?
            .ok_or_else(|| SessionError::SessionNotFound(id.to_string()))
    }

    /// Bootstrap the namespace identity object. Reserved kind: the
    /// attachment path refuses to copy it.
    fn ensure_default_identity(&self, namespace: &str) -> SessionResult<()> {
        if self.store.get_secret(namespace, DEFAULT_IDENTITY)?.is_some() {
            return Ok(());
        }
        let mut secret = SecretRecord {
            name: DEFAULT_IDENTITY.to_string(),
            namespace: namespace.to_string(),
            kind: SecretKind::ServiceAccountToken,
            data: [("token".to_string(), Uuid::new_v4().simple().to_string())].into(),
            owner: None,
            resource_version: 0,
        };
        match self.store.create_secret(&mut secret) {
            Ok(()) | Err(StateError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_creates_namespace_and_identity() {
        let store = StateStore::open_in_memory().unwrap();
        let registry = SessionRegistry::new(store.clone());

        let session = registry.register("demo").unwrap();
        assert!(session.namespace.starts_with("berth-"));
        assert!(store.get_namespace(&session.namespace).unwrap().is_some());

        let identity = store
            .get_secret(&session.namespace, DEFAULT_IDENTITY)
            .unwrap()
            .unwrap();
        assert_eq!(identity.kind, SecretKind::ServiceAccountToken);
    }

    #[test]
    fn lookup_round_trips() {
        let store = StateStore::open_in_memory().unwrap();
        let registry = SessionRegistry::new(store);

        let session = registry.register("demo").unwrap();
        let found = registry.lookup(&session.id).unwrap();
        assert_eq!(found, session);
    }

    #[test]
    fn lookup_unknown_is_a_precondition_error() {
        let store = StateStore::open_in_memory().unwrap();
        let registry = SessionRegistry::new(store);

        let err = registry.lookup("nope").unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn sessions_get_distinct_namespaces() {
        let store = StateStore::open_in_memory().unwrap();
        let registry = SessionRegistry::new(store);

        let a = registry.register("a").unwrap();
        let b = registry.register("b").unwrap();
        assert_ne!(a.namespace, b.namespace);
    }
}
