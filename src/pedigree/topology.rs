//! Source topologies: how each site enumerates the ancestors on its
//! pedigree page, expressed as the label of every raw extraction index.
//!
//! A pedigree table for `G` generations has `2^G` rows. The ancestor in
//! generation `g` at slot `k` occupies `2^(G-g)` rows starting at row
//! `k * 2^(G-g)`, in column `g - 1`. Grid topologies derive labels from those
//! coordinates instead of carrying per-site index constants.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::position::{generate_labels, slot_count, PositionLabel, MAX_GENERATION};
use crate::error::{SyncError, SyncResult};

/// Site a pedigree page was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PedigreeSource {
    /// Already in canonical (breadth-first, sire first) order.
    #[default]
    Canonical,
    /// jbis.or.jp, collected generation by generation down each column.
    Jbis,
    /// db.netkeiba.com, collected row by row from the rowspan table.
    Netkeiba,
}

impl fmt::Display for PedigreeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PedigreeSource::Canonical => "canonical",
            PedigreeSource::Jbis => "jbis",
            PedigreeSource::Netkeiba => "netkeiba",
        };
        f.write_str(name)
    }
}

/// A site's enumeration order of ancestor references.
pub trait SourceTopology {
    fn name(&self) -> &str;

    fn max_generation(&self) -> u32;

    /// The slot label of every raw index, in raw extraction order.
    fn raw_order(&self) -> SyncResult<Vec<PositionLabel>>;
}

/// Topology for a source.
pub fn topology_for(source: PedigreeSource, max_generation: u32) -> Box<dyn SourceTopology> {
    match source {
        PedigreeSource::Canonical => Box::new(CanonicalOrder { max_generation }),
        PedigreeSource::Jbis => Box::new(ColumnMajorGrid {
            name: source.to_string(),
            max_generation,
        }),
        PedigreeSource::Netkeiba => Box::new(RowMajorGrid {
            name: source.to_string(),
            max_generation,
        }),
    }
}

/// Identity permutation.
#[derive(Debug, Clone)]
pub struct CanonicalOrder {
    pub max_generation: u32,
}

impl SourceTopology for CanonicalOrder {
    fn name(&self) -> &str {
        "canonical"
    }

    fn max_generation(&self) -> u32 {
        self.max_generation
    }

    fn raw_order(&self) -> SyncResult<Vec<PositionLabel>> {
        generate_labels(self.max_generation)
    }
}

/// Table read column by column, each column top to bottom.
#[derive(Debug, Clone)]
pub struct ColumnMajorGrid {
    pub name: String,
    pub max_generation: u32,
}

impl SourceTopology for ColumnMajorGrid {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_generation(&self) -> u32 {
        self.max_generation
    }

    fn raw_order(&self) -> SyncResult<Vec<PositionLabel>> {
        let grid = Grid::new(self.max_generation)?;
        let mut order = Vec::with_capacity(slot_count(self.max_generation));
        for column in 0..grid.columns() {
            for row in 0..grid.rows() {
                if let Some(label) = grid.cell_label(row, column)? {
                    order.push(label);
                }
            }
        }
        Ok(order)
    }
}

/// Rowspan table read row by row; a cell is enumerated in the first row it
/// spans, so the walk is a sire-first preorder of the tree.
#[derive(Debug, Clone)]
pub struct RowMajorGrid {
    pub name: String,
    pub max_generation: u32,
}

impl SourceTopology for RowMajorGrid {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_generation(&self) -> u32 {
        self.max_generation
    }

    fn raw_order(&self) -> SyncResult<Vec<PositionLabel>> {
        let grid = Grid::new(self.max_generation)?;
        let mut order = Vec::with_capacity(slot_count(self.max_generation));
        for row in 0..grid.rows() {
            for column in 0..grid.columns() {
                if let Some(label) = grid.cell_label(row, column)? {
                    order.push(label);
                }
            }
        }
        Ok(order)
    }
}

/// Declared list of labels in raw order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplicitTopology {
    pub name: String,
    pub max_generation: u32,
    pub labels: Vec<String>,
}

impl SourceTopology for ExplicitTopology {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_generation(&self) -> u32 {
        self.max_generation
    }

    fn raw_order(&self) -> SyncResult<Vec<PositionLabel>> {
        self.labels.iter().map(|l| PositionLabel::parse(l)).collect()
    }
}

/// Row/column geometry of a `2^G`-row pedigree table.
#[derive(Debug, Clone, Copy)]
struct Grid {
    max_generation: u32,
}

impl Grid {
    fn new(max_generation: u32) -> SyncResult<Self> {
        if max_generation == 0 || max_generation > MAX_GENERATION {
            return Err(SyncError::InvalidArgument(format!(
                "pedigree tables span 1..={MAX_GENERATION} generations, got {max_generation}"
            )));
        }
        let grid = Self { max_generation };
        grid.verify()?;
        Ok(grid)
    }

    fn rows(&self) -> usize {
        1 << self.max_generation
    }

    fn columns(&self) -> usize {
        self.max_generation as usize
    }

    fn span(&self, generation: u32) -> usize {
        1 << (self.max_generation - generation)
    }

    /// Label of the cell starting at (`row`, `column`), if one starts there.
    fn cell_label(&self, row: usize, column: usize) -> SyncResult<Option<PositionLabel>> {
        let generation = column as u32 + 1;
        let span = self.span(generation);
        if row % span != 0 {
            return Ok(None);
        }
        PositionLabel::from_generation_index(generation, row / span).map(Some)
    }

    /// Re-derive every father/mother pair from coordinates: the parent cell
    /// starts at the block boundary one column left and must carry the
    /// child's label prefix; the child is the sire iff it starts on the
    /// parent's first row.
    fn verify(&self) -> SyncResult<()> {
        for column in 1..self.columns() {
            let parent_span = self.span(column as u32);
            for row in 0..self.rows() {
                let Some(child) = self.cell_label(row, column)? else {
                    continue;
                };
                let parent_row = row - row % parent_span;
                let parent = self.cell_label(parent_row, column - 1)?.ok_or_else(|| {
                    SyncError::InvariantViolation(format!(
                        "no parent cell for {child} at row {parent_row}"
                    ))
                })?;
                if child.parent().as_ref() != Some(&parent) {
                    return Err(SyncError::InvariantViolation(format!(
                        "cell {child} at ({row}, {column}) sits under {parent}"
                    )));
                }
                if child.is_sire() != (row == parent_row) {
                    return Err(SyncError::InvariantViolation(format!(
                        "cell {child} at ({row}, {column}) has the wrong sire/dam side"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Verified mapping from raw extraction index to canonical slot.
#[derive(Debug, Clone)]
pub struct Permutation {
    source: String,
    max_generation: u32,
    slots: Vec<PositionLabel>,
}

impl Permutation {
    /// Build and verify the permutation a topology declares.
    ///
    /// Fails with `InvariantViolation` unless the raw order is a bijection
    /// onto the canonical labels of the topology's depth.
    pub fn derive(topology: &dyn SourceTopology) -> SyncResult<Self> {
        let max_generation = topology.max_generation();
        let canonical = generate_labels(max_generation)?;
        let slots = topology.raw_order()?;

        if slots.len() != canonical.len() {
            return Err(SyncError::InvariantViolation(format!(
                "topology {} declares {} slots, {} generations need {}",
                topology.name(),
                slots.len(),
                max_generation,
                canonical.len()
            )));
        }

        let mut seen = vec![false; canonical.len()];
        for label in &slots {
            if label.generation() > max_generation {
                return Err(SyncError::InvariantViolation(format!(
                    "topology {} places {label} beyond generation {max_generation}",
                    topology.name()
                )));
            }
            let index = label.canonical_index();
            if std::mem::replace(&mut seen[index], true) {
                return Err(SyncError::InvariantViolation(format!(
                    "topology {} maps two raw indexes to {label}",
                    topology.name()
                )));
            }
        }

        for label in &slots {
            if let Some(parent) = label.parent() {
                if !seen[parent.canonical_index()] {
                    return Err(SyncError::InvariantViolation(format!(
                        "topology {} has {label} but not {parent}",
                        topology.name()
                    )));
                }
            }
        }

        Ok(Self {
            source: topology.name().to_string(),
            max_generation,
            slots,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn max_generation(&self) -> u32 {
        self.max_generation
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn label(&self, raw_index: usize) -> Option<&PositionLabel> {
        self.slots.get(raw_index)
    }

    pub fn canonical_index(&self, raw_index: usize) -> Option<usize> {
        self.label(raw_index).map(PositionLabel::canonical_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(topology: &dyn SourceTopology) -> Vec<String> {
        topology
            .raw_order()
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_row_major_is_preorder() {
        let grid = RowMajorGrid {
            name: "netkeiba".into(),
            max_generation: 2,
        };
        assert_eq!(order(&grid), vec!["f", "ff", "fm", "m", "mf", "mm"]);
    }

    #[test]
    fn test_column_major_is_canonical() {
        let grid = ColumnMajorGrid {
            name: "jbis".into(),
            max_generation: 5,
        };
        let canonical: Vec<String> = generate_labels(5)
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(order(&grid), canonical);
    }

    #[test]
    fn test_row_major_five_generations_first_row() {
        let grid = RowMajorGrid {
            name: "netkeiba".into(),
            max_generation: 5,
        };
        let labels = order(&grid);
        assert_eq!(labels.len(), 62);
        assert_eq!(&labels[..6], &["f", "ff", "fff", "ffff", "fffff", "ffffm"]);
        // Row 16 opens the dam half.
        let dam = labels.iter().position(|l| l == "m").unwrap();
        assert_eq!(&labels[dam..dam + 5], &["m", "mf", "mff", "mfff", "mffff"]);
        assert_eq!(labels.last().unwrap(), "mmmmm");
    }

    #[test]
    fn test_every_source_derives() {
        for source in [
            PedigreeSource::Canonical,
            PedigreeSource::Jbis,
            PedigreeSource::Netkeiba,
        ] {
            let topology = topology_for(source, MAX_GENERATION);
            let permutation = Permutation::derive(topology.as_ref()).unwrap();
            assert_eq!(permutation.len(), 62);
            assert_eq!(permutation.source(), source.to_string());
        }
    }

    #[test]
    fn test_explicit_duplicate_rejected() {
        let topology = ExplicitTopology {
            name: "dup".into(),
            max_generation: 1,
            labels: vec!["f".into(), "f".into()],
        };
        assert!(matches!(
            Permutation::derive(&topology),
            Err(SyncError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_explicit_incomplete_rejected() {
        let topology = ExplicitTopology {
            name: "short".into(),
            max_generation: 2,
            labels: vec!["f".into(), "m".into(), "ff".into()],
        };
        assert!(matches!(
            Permutation::derive(&topology),
            Err(SyncError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_explicit_too_deep_rejected() {
        let topology = ExplicitTopology {
            name: "deep".into(),
            max_generation: 1,
            labels: vec!["f".into(), "fm".into()],
        };
        assert!(Permutation::derive(&topology).is_err());
    }

    #[test]
    fn test_grid_depth_bounds() {
        let grid = RowMajorGrid {
            name: "x".into(),
            max_generation: 6,
        };
        assert!(matches!(grid.raw_order(), Err(SyncError::InvalidArgument(_))));
    }

    #[test]
    fn test_source_serde() {
        let source: PedigreeSource = serde_json::from_str("\"netkeiba\"").unwrap();
        assert_eq!(source, PedigreeSource::Netkeiba);
    }
}
