//! The curated data-source catalog.
//!
//! Catalog entries are credential objects in the reserved catalog
//! namespace, seeded by the platform operator. Callers only ever see the
//! names and the variable names an attachment would contribute.

use berth_core::{CATALOG_NAMESPACE, env_var_name};
use berth_state::{SecretRecord, StateStore};

use crate::error::{AttachError, AttachResult};

/// Caller-facing view of one catalog entry: names only, never values or
/// the entry's backing location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceInfo {
    pub name: String,
    pub var_names: Vec<String>,
}

/// List the catalog.
pub fn list_sources(store: &StateStore) -> AttachResult<Vec<DataSourceInfo>> {
    let mut sources: Vec<DataSourceInfo> = store
        .list_secrets_in(CATALOG_NAMESPACE)?
        .iter()
        .map(describe)
        .collect();
    sources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sources)
}

/// Resolve one catalog entry.
pub fn lookup_source(store: &StateStore, name: &str) -> AttachResult<SecretRecord> {
    store
        .get_secret(CATALOG_NAMESPACE, name)?
        .ok_or_else(|| AttachError::SourceNotFound(name.to_string()))
}

/// Variable names a catalog entry contributes: its data keys, folded to
/// environment-variable form. BTreeMap keys keep the order stable.
pub fn contributed_vars(entry: &SecretRecord) -> Vec<String> {
    entry.data.keys().map(|k| env_var_name(k)).collect()
}

fn describe(entry: &SecretRecord) -> DataSourceInfo {
    DataSourceInfo {
        name: entry.name.clone(),
        var_names: contributed_vars(entry),
    }
}
