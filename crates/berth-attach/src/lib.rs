//! berth-attach — data-source attachment.
//!
//! Copies a curated, read-only credential bundle from the catalog
//! namespace into a caller's namespace and records the attachment on the
//! workload. The copy is owner-referenced to the workload (garbage-
//! collected with it), collision-checked against every variable already
//! on the workload, and audited. Credential values never appear in any
//! payload this crate produces — only the resulting variable names.

pub mod attach;
pub mod catalog;
pub mod error;

pub use attach::{AttachOutcome, attach, detach};
pub use catalog::{DataSourceInfo, list_sources};
pub use error::{AttachError, AttachResult};
