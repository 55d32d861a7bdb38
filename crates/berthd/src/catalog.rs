//! Data-source catalog seeding.
//!
//! The platform operator curates a TOML file of data-source entries;
//! berthd loads them into the reserved catalog namespace at startup.
//! Seeding is idempotent: existing entries are left untouched, so a
//! restart never clobbers a catalog that was rotated out-of-band.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use berth_core::{CATALOG_NAMESPACE, now_unix};
use berth_state::{SecretKind, SecretRecord, StateStore};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    source: Vec<CatalogSource>,
}

#[derive(Debug, Deserialize)]
struct CatalogSource {
    name: String,
    kind: SecretKind,
    data: BTreeMap<String, String>,
}

/// Load the catalog file and seed missing entries. Returns how many
/// entries were created.
pub fn seed_catalog(store: &StateStore, path: &Path) -> anyhow::Result<usize> {
    let content = std::fs::read_to_string(path)?;
    let catalog: CatalogFile = toml::from_str(&content)?;

    store.ensure_namespace(CATALOG_NAMESPACE, now_unix())?;

    let mut created = 0;
    for entry in catalog.source {
        if store.get_secret(CATALOG_NAMESPACE, &entry.name)?.is_some() {
            debug!(source = %entry.name, "catalog entry already present");
            continue;
        }
        let mut secret = SecretRecord {
            name: entry.name.clone(),
            namespace: CATALOG_NAMESPACE.to_string(),
            kind: entry.kind,
            data: entry.data,
            owner: None,
            resource_version: 0,
        };
        store.create_secret(&mut secret)?;
        debug!(source = %entry.name, "catalog entry seeded");
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("catalog.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn seeding_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            &dir,
            r#"
            [[source]]
            name = "api-keys"
            kind = "opaque"
            [source.data]
            api-token = "t0ken"
            "#,
        );
        let store = StateStore::open_in_memory().unwrap();

        assert_eq!(seed_catalog(&store, &path).unwrap(), 1);
        assert_eq!(seed_catalog(&store, &path).unwrap(), 0);

        let entry = store.get_secret(CATALOG_NAMESPACE, "api-keys").unwrap().unwrap();
        assert_eq!(entry.kind, SecretKind::Opaque);
    }

    #[test]
    fn empty_catalog_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(&dir, "");
        let store = StateStore::open_in_memory().unwrap();
        assert_eq!(seed_catalog(&store, &path).unwrap(), 0);
    }
}
