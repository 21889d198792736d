//! Entity records exchanged between the parse collaborator and the store.
//!
//! All identifiers are opaque strings assigned by the source site. Optional
//! fields are the ones a page may not carry; `None` is stored as NULL.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::pedigree::position::PositionLabel;

/// Race header. Immutable after the first successful write.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RaceRecord {
    pub race_id: String,
    pub date: Option<NaiveDate>,
    pub venue: Option<String>,
    pub race_class: Option<String>,
    pub race_name: Option<String>,
    pub race_round: Option<u32>,
    /// Surface: 芝, ダート, 障害
    pub course_type: Option<String>,
    /// Track configuration: 右, 左, 直線
    pub rotation: Option<String>,
    pub distance: Option<u32>,
    pub weather: Option<String>,
    /// Going
    pub state: Option<String>,
    pub entries: Option<u32>,
}

/// One runner's result, identified by (race_id, horse_id).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultRecord {
    pub race_id: String,
    pub horse_id: String,
    pub rank: Option<u32>,
    pub frame_no: Option<u32>,
    pub horse_no: Option<u32>,
    pub jockey_id: Option<String>,
    /// Only used to name a jockey stub; not a results column.
    pub jockey_name: Option<String>,
    pub trainer_id: Option<String>,
    /// Only used to name a trainer stub; not a results column.
    pub trainer_name: Option<String>,
    pub sex: Option<String>,
    pub age: Option<u32>,
    /// Carried weight (斤量)
    pub weight: Option<f64>,
    pub time_seconds: Option<f64>,
    pub margin: Option<String>,
    /// Corner passage order, e.g. "2-2-2"
    pub passing: Option<String>,
    pub last_3f: Option<f64>,
    pub odds: Option<f64>,
    pub popularity: Option<u32>,
    pub horse_weight: Option<u32>,
    pub weight_diff: Option<i32>,
}

/// Horse profile. `name` empty or absent marks a stub.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HorseRecord {
    pub horse_id: String,
    pub name: Option<String>,
    /// `YYYY-MM-DD`, or `YYYY` when the page only gives the year.
    pub birth_date: Option<String>,
    pub sex: Option<String>,
    pub trainer_id: Option<String>,
    pub owner_id: Option<String>,
    pub breeder_id: Option<String>,
}

impl HorseRecord {
    pub fn stub(horse_id: impl Into<String>) -> Self {
        Self {
            horse_id: horse_id.into(),
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }
}

/// Jockey or trainer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonRecord {
    pub person_id: String,
    pub name: Option<String>,
    /// Stable / regional affiliation, e.g. 美浦, 栗東
    pub belonging: Option<String>,
    pub birth_date: Option<String>,
}

impl PersonRecord {
    pub fn stub(person_id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            person_id: person_id.into(),
            name,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub owner_id: String,
    pub name: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BreederRecord {
    pub breeder_id: String,
    pub name: String,
}

/// The ancestor occupying slot `position` in `horse_id`'s lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedigreeEdge {
    pub horse_id: String,
    pub ancestor_id: String,
    pub generation: u32,
    pub position: PositionLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonKind {
    Jockey,
    Trainer,
}

impl PersonKind {
    pub fn table(self) -> &'static str {
        match self {
            PersonKind::Jockey => "jockeys",
            PersonKind::Trainer => "trainers",
        }
    }

    pub fn id_column(self) -> &'static str {
        match self {
            PersonKind::Jockey => "jockey_id",
            PersonKind::Trainer => "trainer_id",
        }
    }
}

/// JRA racecourse codes, positions 5-6 of a race id.
const VENUES: [(&str, &str); 10] = [
    ("01", "札幌"),
    ("02", "函館"),
    ("03", "福島"),
    ("04", "新潟"),
    ("05", "東京"),
    ("06", "中山"),
    ("07", "中京"),
    ("08", "京都"),
    ("09", "阪神"),
    ("10", "小倉"),
];

/// Accessors for netkeiba race ids: `YYYY` `PP` (venue) `KK` (meeting)
/// `DD` (day) `RR` (round).
pub struct RaceId;

impl RaceId {
    pub fn is_well_formed(race_id: &str) -> bool {
        race_id.len() == 12 && race_id.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn year(race_id: &str) -> Option<&str> {
        Self::is_well_formed(race_id).then(|| &race_id[..4])
    }

    pub fn venue_code(race_id: &str) -> Option<&str> {
        Self::is_well_formed(race_id).then(|| &race_id[4..6])
    }

    pub fn round(race_id: &str) -> Option<u32> {
        Self::is_well_formed(race_id)
            .then(|| race_id[10..].parse().ok())
            .flatten()
    }

    /// Venue name, `None` for ids outside the JRA code table.
    pub fn venue(race_id: &str) -> Option<&'static str> {
        let code = Self::venue_code(race_id)?;
        VENUES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| *name)
    }
}
