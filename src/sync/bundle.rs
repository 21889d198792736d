//! One logical unit of freshly parsed data.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{SyncError, SyncResult};
use crate::pedigree::MAX_GENERATION;
use crate::types::{
    BreederRecord, HorseRecord, OwnerRecord, PedigreeEdge, PersonKind, PersonRecord, RaceRecord,
    ResultRecord,
};

/// Everything one race page, horse profile or person profile produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bundle {
    pub race: Option<RaceRecord>,
    pub results: Vec<ResultRecord>,
    pub horses: Vec<HorseRecord>,
    pub jockeys: Vec<PersonRecord>,
    pub trainers: Vec<PersonRecord>,
    pub owners: Vec<OwnerRecord>,
    pub breeders: Vec<BreederRecord>,
    pub pedigree: Vec<PedigreeEdge>,
}

impl Bundle {
    pub fn race_page(race: RaceRecord, results: Vec<ResultRecord>) -> Self {
        Self {
            race: Some(race),
            results,
            ..Default::default()
        }
    }

    pub fn horse_profile(
        horse: HorseRecord,
        owner: Option<OwnerRecord>,
        breeder: Option<BreederRecord>,
        pedigree: Vec<PedigreeEdge>,
    ) -> Self {
        Self {
            horses: vec![horse],
            owners: owner.into_iter().collect(),
            breeders: breeder.into_iter().collect(),
            pedigree,
            ..Default::default()
        }
    }

    pub fn person_profile(kind: PersonKind, person: PersonRecord) -> Self {
        match kind {
            PersonKind::Jockey => Self {
                jockeys: vec![person],
                ..Default::default()
            },
            PersonKind::Trainer => Self {
                trainers: vec![person],
                ..Default::default()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.race.is_none()
            && self.results.is_empty()
            && self.horses.is_empty()
            && self.jockeys.is_empty()
            && self.trainers.is_empty()
            && self.owners.is_empty()
            && self.breeders.is_empty()
            && self.pedigree.is_empty()
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        if let Some(race) = &self.race {
            return format!("race {} ({} results)", race.race_id, self.results.len());
        }
        if let [horse] = self.horses.as_slice() {
            return format!("horse {} ({} edges)", horse.horse_id, self.pedigree.len());
        }
        if let [jockey] = self.jockeys.as_slice() {
            return format!("jockey {}", jockey.person_id);
        }
        if let [trainer] = self.trainers.as_slice() {
            return format!("trainer {}", trainer.person_id);
        }
        format!(
            "bundle ({} horses, {} persons, {} edges)",
            self.horses.len(),
            self.jockeys.len() + self.trainers.len(),
            self.pedigree.len()
        )
    }

    /// Reject structurally inconsistent bundles before anything is written.
    pub fn validate(&self) -> SyncResult<()> {
        if let Some(race) = &self.race {
            require_id("race", &race.race_id)?;
        }

        if !self.results.is_empty() {
            let race = self.race.as_ref().ok_or_else(|| {
                malformed(format!("{} results without their race", self.results.len()))
            })?;
            for result in &self.results {
                require_id("result horse", &result.horse_id)?;
                if result.race_id != race.race_id {
                    return Err(malformed(format!(
                        "result for horse {} belongs to race {:?}, bundle race is {}",
                        result.horse_id, result.race_id, race.race_id
                    )));
                }
            }
        }

        for horse in &self.horses {
            require_id("horse", &horse.horse_id)?;
        }
        for person in self.jockeys.iter().chain(&self.trainers) {
            require_id("person", &person.person_id)?;
        }

        let owners: HashSet<&str> = self.owners.iter().map(|o| o.owner_id.as_str()).collect();
        for owner in &self.owners {
            require_id("owner", &owner.owner_id)?;
            require_id("owner name", &owner.name)?;
        }
        let breeders: HashSet<&str> =
            self.breeders.iter().map(|b| b.breeder_id.as_str()).collect();
        for breeder in &self.breeders {
            require_id("breeder", &breeder.breeder_id)?;
            require_id("breeder name", &breeder.name)?;
        }
        for horse in &self.horses {
            if let Some(owner_id) = horse.owner_id.as_deref() {
                if !owners.contains(owner_id) {
                    return Err(malformed(format!(
                        "horse {} references owner {} missing from the bundle",
                        horse.horse_id, owner_id
                    )));
                }
            }
            if let Some(breeder_id) = horse.breeder_id.as_deref() {
                if !breeders.contains(breeder_id) {
                    return Err(malformed(format!(
                        "horse {} references breeder {} missing from the bundle",
                        horse.horse_id, breeder_id
                    )));
                }
            }
        }

        let horses: HashSet<&str> = self.horses.iter().map(|h| h.horse_id.as_str()).collect();
        for edge in &self.pedigree {
            if !horses.contains(edge.horse_id.as_str()) {
                return Err(malformed(format!(
                    "pedigree edge {} of horse {} without its horse",
                    edge.position, edge.horse_id
                )));
            }
            require_id("ancestor", &edge.ancestor_id)?;
        }

        Ok(())
    }

    /// Pedigree edges that satisfy the slot invariants; the rest are logged
    /// and dropped.
    pub fn checked_pedigree(&self) -> Vec<&PedigreeEdge> {
        self.pedigree
            .iter()
            .filter(|edge| match check_edge(edge) {
                Ok(()) => true,
                Err(e) => {
                    warn!("dropping pedigree edge: {}", e);
                    false
                }
            })
            .collect()
    }
}

fn check_edge(edge: &PedigreeEdge) -> SyncResult<()> {
    if edge.generation == 0 || edge.generation > MAX_GENERATION {
        return Err(SyncError::InvariantViolation(format!(
            "edge {}/{} is outside generations 1..={MAX_GENERATION}",
            edge.horse_id, edge.position
        )));
    }
    if edge.generation != edge.position.generation() {
        return Err(SyncError::InvariantViolation(format!(
            "edge {}/{} has generation {}",
            edge.horse_id, edge.position, edge.generation
        )));
    }
    if edge.ancestor_id == edge.horse_id {
        return Err(SyncError::InvariantViolation(format!(
            "horse {} listed as its own ancestor at {}",
            edge.horse_id, edge.position
        )));
    }
    Ok(())
}

fn require_id(what: &str, value: &str) -> SyncResult<()> {
    if value.trim().is_empty() {
        return Err(malformed(format!("empty {what} identifier")));
    }
    Ok(())
}

fn malformed(message: String) -> SyncError {
    SyncError::MalformedBundle(message)
}
