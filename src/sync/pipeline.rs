//! Ingest path from parsed pages to the store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::bundle::Bundle;
use super::synchronizer::{SyncReport, Synchronizer};
use crate::error::{SyncError, SyncResult};
use crate::pedigree::{AncestorExtractor, PedigreeSource, MAX_GENERATION};
use crate::storage::Store;

/// Ancestor references exactly as collected from a pedigree page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPedigree {
    pub horse_id: String,
    #[serde(default)]
    pub source: PedigreeSource,
    /// One entry per raw index; `None` where the page had no link.
    pub ancestors: Vec<Option<String>>,
}

/// What the fetch/parse side hands over for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedUnit {
    #[serde(flatten)]
    pub bundle: Bundle,
    #[serde(default)]
    pub raw_pedigree: Option<RawPedigree>,
}

impl ParsedUnit {
    pub fn is_empty(&self) -> bool {
        self.bundle.is_empty() && self.raw_pedigree.is_none()
    }
}

/// Holds one verified extractor per source.
pub struct Pipeline {
    max_generation: u32,
    extractors: HashMap<PedigreeSource, AncestorExtractor>,
}

impl Pipeline {
    pub fn new(max_generation: u32) -> SyncResult<Self> {
        if !(1..=MAX_GENERATION).contains(&max_generation) {
            return Err(SyncError::InvalidArgument(format!(
                "max_generation must be in 1..={MAX_GENERATION}, got {max_generation}"
            )));
        }
        let mut extractors = HashMap::new();
        for source in [
            PedigreeSource::Canonical,
            PedigreeSource::Jbis,
            PedigreeSource::Netkeiba,
        ] {
            extractors.insert(source, AncestorExtractor::for_source(source, max_generation)?);
        }
        debug!("Pipeline ready for {} generations", max_generation);
        Ok(Self {
            max_generation,
            extractors,
        })
    }

    pub fn max_generation(&self) -> u32 {
        self.max_generation
    }

    pub fn extractor(&self, source: PedigreeSource) -> Option<&AncestorExtractor> {
        self.extractors.get(&source)
    }

    /// Turn raw references into edges and merge them into the bundle.
    pub fn prepare(&self, unit: ParsedUnit) -> Bundle {
        let ParsedUnit {
            mut bundle,
            raw_pedigree,
        } = unit;

        if let Some(raw) = raw_pedigree {
            match self.extractor(raw.source) {
                Some(extractor) => {
                    let edges = extractor.extract_edges(&raw.horse_id, &raw.ancestors);
                    debug!(
                        "Extracted {} of {} {} references for {}",
                        edges.len(),
                        raw.ancestors.len(),
                        raw.source,
                        raw.horse_id
                    );
                    bundle.pedigree.extend(edges);
                }
                None => warn!("No extractor for source {}", raw.source),
            }
        }
        bundle
    }

    pub fn ingest(&self, store: &mut Store, unit: ParsedUnit) -> SyncResult<SyncReport> {
        if unit.is_empty() {
            debug!("Empty unit, nothing to sync");
            return Ok(SyncReport::default());
        }
        let bundle = self.prepare(unit);
        Synchronizer::new(store).sync(&bundle)
    }
}
