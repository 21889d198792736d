//! Canonical ancestor position labels.
//!
//! A label is a path from the horse to one ancestor over the alphabet
//! `{f, m}`: `f` steps to the sire, `m` to the dam. `"ffm"` is the paternal
//! grandsire's dam on every source. Generation `g` holds `2^g` labels, so a
//! five-generation pedigree has 2 + 4 + 8 + 16 + 32 = 62 slots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Depth stored for every horse.
pub const MAX_GENERATION: u32 = 5;

/// Upper bound accepted by [`generate_labels`]; deeper trees are not a
/// pedigree anyone publishes and would only allocate.
pub const SCHEME_LIMIT: u32 = 16;

const SIRE: char = 'f';
const DAM: char = 'm';

/// A validated slot label such as `"fm"` (sire's dam).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PositionLabel(String);

impl PositionLabel {
    pub fn parse(raw: &str) -> SyncResult<Self> {
        if raw.is_empty() {
            return Err(SyncError::InvalidArgument("empty position label".to_string()));
        }
        if let Some(bad) = raw.chars().find(|c| *c != SIRE && *c != DAM) {
            return Err(SyncError::InvalidArgument(format!(
                "position label {raw:?} contains {bad:?}; only 'f' and 'm' are allowed"
            )));
        }
        if raw.len() as u32 > SCHEME_LIMIT {
            return Err(SyncError::InvalidArgument(format!(
                "position label {raw:?} is deeper than {SCHEME_LIMIT} generations"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Label for the `index`-th slot (0-based, top to bottom) of `generation`.
    pub fn from_generation_index(generation: u32, index: usize) -> SyncResult<Self> {
        if generation == 0 || generation > SCHEME_LIMIT {
            return Err(SyncError::InvalidArgument(format!(
                "generation {generation} outside 1..={SCHEME_LIMIT}"
            )));
        }
        if index >= 1usize << generation {
            return Err(SyncError::InvalidArgument(format!(
                "slot {index} does not exist in generation {generation}"
            )));
        }
        let label = (0..generation)
            .rev()
            .map(|bit| if index >> bit & 1 == 0 { SIRE } else { DAM })
            .collect();
        Ok(Self(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn generation(&self) -> u32 {
        self.0.len() as u32
    }

    /// Slot index within its own generation, top to bottom.
    pub fn generation_index(&self) -> usize {
        self.0
            .chars()
            .fold(0, |acc, c| acc << 1 | usize::from(c == DAM))
    }

    /// Index in the sequence returned by [`generate_labels`].
    pub fn canonical_index(&self) -> usize {
        (1usize << self.generation()) - 2 + self.generation_index()
    }

    /// The child this ancestor is a parent of, `None` for generation 1.
    pub fn parent(&self) -> Option<Self> {
        (self.0.len() > 1).then(|| Self(self.0[..self.0.len() - 1].to_string()))
    }

    pub fn is_sire(&self) -> bool {
        self.0.ends_with(SIRE)
    }

    pub fn sire(&self) -> Self {
        Self(format!("{}{SIRE}", self.0))
    }

    pub fn dam(&self) -> Self {
        Self(format!("{}{DAM}", self.0))
    }
}

impl fmt::Display for PositionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PositionLabel {
    type Error = SyncError;

    fn try_from(value: String) -> SyncResult<Self> {
        Self::parse(&value)
    }
}

impl From<PositionLabel> for String {
    fn from(label: PositionLabel) -> Self {
        label.0
    }
}

/// Number of slots in generations `1..=max_generation`.
pub fn slot_count(max_generation: u32) -> usize {
    (1usize << (max_generation + 1)) - 2
}

/// Every slot label from generation 1 to `max_generation`.
///
/// Generation `g` is generation `g - 1` with each label extended by `f` and
/// then by `m`, so the sire branch always precedes the dam branch.
pub fn generate_labels(max_generation: u32) -> SyncResult<Vec<PositionLabel>> {
    if max_generation > SCHEME_LIMIT {
        return Err(SyncError::InvalidArgument(format!(
            "max generation {max_generation} exceeds {SCHEME_LIMIT}"
        )));
    }

    let mut labels = Vec::with_capacity(slot_count(max_generation));
    let mut current = vec![PositionLabel(String::new())];
    for _ in 0..max_generation {
        let next: Vec<PositionLabel> = current
            .iter()
            .flat_map(|label| [label.sire(), label.dam()])
            .collect();
        labels.extend(next.iter().cloned());
        current = next;
    }
    Ok(labels)
}

/// Parse a textual generation depth (CLI or config input).
pub fn parse_generation(raw: &str) -> SyncResult<u32> {
    let trimmed = raw.trim();
    let value: i64 = trimmed.parse().map_err(|_| {
        SyncError::InvalidArgument(format!("generation {trimmed:?} is not an integer"))
    })?;
    u32::try_from(value)
        .map_err(|_| SyncError::InvalidArgument(format!("generation {value} is out of range")))
}
