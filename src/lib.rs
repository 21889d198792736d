//! Pedigree slot encoding and incremental synchronization of scraped
//! horse-racing data into a SQLite store.
//!
//! - [`pedigree`]: canonical `f`/`m` slot labels and per-site extraction order
//! - [`sync`]: bundle validation, idempotent writes, work reconciliation
//! - [`storage`]: schema and lookups

pub mod config;
pub mod error;
pub mod normalize;
pub mod pedigree;
pub mod storage;
pub mod sync;
pub mod types;

pub use error::{SyncError, SyncResult};
pub use pedigree::{generate_labels, AncestorExtractor, PositionLabel};
pub use storage::Store;
pub use sync::{Bundle, ParsedUnit, Pipeline, Reconciler, SyncReport, Synchronizer, WorkSet};
