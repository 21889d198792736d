//! Maps a source's raw ancestor references onto canonical pedigree slots.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::position::PositionLabel;
use super::reference::{try_resolve, ReferenceKind};
use super::topology::{topology_for, PedigreeSource, Permutation, SourceTopology};
use crate::error::{SyncError, SyncResult};
use crate::types::PedigreeEdge;

/// One resolved ancestor at one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorSlot {
    pub ancestor_id: String,
    pub generation: u32,
    pub position: PositionLabel,
}

impl AncestorSlot {
    /// `generation` must equal the label length.
    pub fn check(&self) -> SyncResult<()> {
        if self.generation != self.position.generation() {
            return Err(SyncError::InvariantViolation(format!(
                "ancestor {} at {} claims generation {}",
                self.ancestor_id, self.position, self.generation
            )));
        }
        Ok(())
    }

    pub fn into_edge(self, horse_id: &str) -> PedigreeEdge {
        PedigreeEdge {
            horse_id: horse_id.to_string(),
            ancestor_id: self.ancestor_id,
            generation: self.generation,
            position: self.position,
        }
    }
}

/// Extractor bound to one verified source permutation.
#[derive(Debug, Clone)]
pub struct AncestorExtractor {
    permutation: Permutation,
}

impl AncestorExtractor {
    pub fn new(topology: &dyn SourceTopology) -> SyncResult<Self> {
        Ok(Self {
            permutation: Permutation::derive(topology)?,
        })
    }

    pub fn for_source(source: PedigreeSource, max_generation: u32) -> SyncResult<Self> {
        Self::new(topology_for(source, max_generation).as_ref())
    }

    pub fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    /// Label every resolvable reference, in canonical slot order.
    ///
    /// Absent or unresolvable references produce no slot. References past the
    /// topology's last slot are ignored.
    pub fn extract(&self, raw: &[Option<String>]) -> Vec<AncestorSlot> {
        if raw.len() > self.permutation.len() {
            warn!(
                "{} pedigree has {} references, topology covers {}; ignoring the rest",
                self.permutation.source(),
                raw.len(),
                self.permutation.len()
            );
        }

        let mut slots: Vec<AncestorSlot> = raw
            .iter()
            .enumerate()
            .filter_map(|(index, reference)| {
                let label = self.permutation.label(index)?;
                let Some(reference) = reference.as_deref() else {
                    debug!("no reference at raw index {} ({})", index, label);
                    return None;
                };
                let ancestor_id = match try_resolve(ReferenceKind::Horse, reference) {
                    Ok(id) => id,
                    Err(e) => {
                        debug!("{} at {}", e, label);
                        return None;
                    }
                };
                Some(AncestorSlot {
                    ancestor_id,
                    generation: label.generation(),
                    position: label.clone(),
                })
            })
            .collect();

        slots.sort_by_key(|slot| slot.position.canonical_index());
        slots.retain(|slot| match slot.check() {
            Ok(()) => true,
            Err(e) => {
                warn!("dropping pedigree slot: {}", e);
                false
            }
        });
        slots
    }

    /// [`extract`](Self::extract) straight into edges for `horse_id`.
    pub fn extract_edges(&self, horse_id: &str, raw: &[Option<String>]) -> Vec<PedigreeEdge> {
        self.extract(raw)
            .into_iter()
            .map(|slot| slot.into_edge(horse_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pedigree::position::generate_labels;
    use crate::pedigree::topology::{CanonicalOrder, ExplicitTopology, RowMajorGrid};

    fn refs(ids: &[&str]) -> Vec<Option<String>> {
        ids.iter().map(|id| Some(id.to_string())).collect()
    }

    fn triples(slots: &[AncestorSlot]) -> Vec<(&str, u32, &str)> {
        slots
            .iter()
            .map(|s| (s.ancestor_id.as_str(), s.generation, s.position.as_str()))
            .collect()
    }

    #[test]
    fn test_canonical_extract() {
        let extractor = AncestorExtractor::new(&CanonicalOrder { max_generation: 2 }).unwrap();
        let slots = extractor.extract(&refs(&["A", "B", "C", "D"]));
        assert_eq!(
            triples(&slots),
            vec![("A", 1, "f"), ("B", 1, "m"), ("C", 2, "ff"), ("D", 2, "fm")]
        );
    }

    #[test]
    fn test_permuted_source_gives_identical_output() {
        let canonical = AncestorExtractor::new(&CanonicalOrder { max_generation: 2 }).unwrap();
        let permuted = AncestorExtractor::new(&ExplicitTopology {
            name: "x".into(),
            max_generation: 2,
            labels: ["f", "ff", "m", "fm", "mf", "mm"].map(String::from).to_vec(),
        })
        .unwrap();

        let expected = canonical.extract(&refs(&["A", "B", "C", "D"]));
        let actual = permuted.extract(&refs(&["A", "C", "B", "D"]));
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_row_major_matches_canonical_for_full_tree() {
        let labels = generate_labels(5).unwrap();
        // Ancestor ids named after their slot.
        let canonical_raw: Vec<Option<String>> =
            labels.iter().map(|l| Some(format!("id_{l}"))).collect();

        let grid = RowMajorGrid {
            name: "netkeiba".into(),
            max_generation: 5,
        };
        let row_raw: Vec<Option<String>> = grid
            .raw_order()
            .unwrap()
            .iter()
            .map(|l| Some(format!("id_{l}")))
            .collect();

        let canonical = AncestorExtractor::for_source(PedigreeSource::Canonical, 5).unwrap();
        let netkeiba = AncestorExtractor::for_source(PedigreeSource::Netkeiba, 5).unwrap();

        let a = canonical.extract(&canonical_raw);
        let b = netkeiba.extract(&row_raw);
        assert_eq!(a.len(), 62);
        assert_eq!(a, b);
        for slot in &b {
            assert_eq!(slot.ancestor_id, format!("id_{}", slot.position));
        }
    }

    #[test]
    fn test_missing_and_malformed_references_are_dropped() {
        let extractor = AncestorExtractor::for_source(PedigreeSource::Jbis, 2).unwrap();
        let raw = vec![
            Some("/horse/0000A/".to_string()),
            None,
            Some("javascript:void(0)".to_string()),
            Some("https://www.jbis.or.jp/horse/0000D/".to_string()),
        ];
        let slots = extractor.extract(&raw);
        assert_eq!(triples(&slots), vec![("0000A", 1, "f"), ("0000D", 2, "fm")]);
    }

    #[test]
    fn test_extra_references_ignored() {
        let extractor = AncestorExtractor::for_source(PedigreeSource::Canonical, 1).unwrap();
        let slots = extractor.extract(&refs(&["A", "B", "C"]));
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn test_slot_check() {
        let slot = AncestorSlot {
            ancestor_id: "A".into(),
            generation: 3,
            position: PositionLabel::parse("fm").unwrap(),
        };
        assert!(matches!(slot.check(), Err(SyncError::InvariantViolation(_))));
    }

    #[test]
    fn test_extract_edges() {
        let extractor = AncestorExtractor::for_source(PedigreeSource::Canonical, 1).unwrap();
        let edges = extractor.extract_edges("H1", &refs(&["S", "D"]));
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].horse_id, "H1");
        assert_eq!(edges[1].position.as_str(), "m");
    }
}
