//! berth-state — the Berth record store.
//!
//! Backed by [redb](https://docs.rs/redb), this is the externally-consistent
//! record store every control-plane operation reads and mutates: one call,
//! one logical transaction.
//!
//! # Architecture
//!
//! All domain records are JSON-serialized into redb's `&[u8]` value columns
//! under `{namespace}/{name}` composite keys. Mutable records carry a
//! `resource_version`; updates are compare-and-swap against the version the
//! caller read, so a truly conflicting concurrent write fails outright
//! instead of silently merging. Records may carry an owner reference; the
//! store garbage-collects owned records when their owner is deleted.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
