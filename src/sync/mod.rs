//! Incremental synchronization: bundles in, idempotent writes out, and work
//! discovery from what the store still lacks.

pub mod bundle;
pub mod pipeline;
pub mod reconciler;
pub mod synchronizer;

pub use bundle::Bundle;
pub use pipeline::{ParsedUnit, Pipeline, RawPedigree};
pub use reconciler::{Reconciler, WorkSet};
pub use synchronizer::{SyncReport, Synchronizer};
