//! Pedigree tree encoding: canonical slot labels, per-source topologies and
//! the extractor that maps one onto the other.

pub mod extractor;
pub mod position;
pub mod reference;
pub mod topology;

pub use extractor::{AncestorExtractor, AncestorSlot};
pub use position::{generate_labels, PositionLabel, MAX_GENERATION};
pub use reference::{resolve, try_resolve, ReferenceKind};
pub use topology::{
    topology_for, ColumnMajorGrid, ExplicitTopology, PedigreeSource, Permutation, RowMajorGrid,
    SourceTopology,
};
