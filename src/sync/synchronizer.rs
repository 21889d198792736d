//! Applies a bundle to the store as one transaction.
//!
//! Write policy:
//! - races, results, owners, breeders, pedigree edges: insert if absent
//! - horses, jockeys, trainers: insert the identity row if absent, then fill
//!   only columns that are still NULL (or an empty name)
//!
//! Inserts use `ON CONFLICT DO NOTHING` so a primary key collision is the only
//! thing silently skipped; any other constraint failure aborts the bundle.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::normalize::{self, non_empty};
use crate::storage::Store;
use crate::types::{
    BreederRecord, HorseRecord, OwnerRecord, PedigreeEdge, PersonKind, PersonRecord, RaceId,
    RaceRecord, ResultRecord,
};

use super::bundle::Bundle;

/// What one `sync` call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// New rows.
    pub inserted: usize,
    /// Rows already present and left untouched.
    pub ignored: usize,
    /// Existing rows that had gaps filled.
    pub enriched: usize,
    /// Pedigree edges dropped for violating slot invariants.
    pub dropped_edges: usize,
}

impl SyncReport {
    fn insert(&mut self, inserted: bool) {
        if inserted {
            self.inserted += 1;
        } else {
            self.ignored += 1;
        }
    }

    fn enrich(&mut self, enriched: bool) {
        if enriched {
            self.enriched += 1;
        }
    }

    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.enriched > 0
    }
}

/// Writes bundles into a store.
pub struct Synchronizer<'a> {
    store: &'a mut Store,
}

impl<'a> Synchronizer<'a> {
    pub fn new(store: &'a mut Store) -> Self {
        Self { store }
    }

    /// Persist every row of `bundle`, or none of them.
    pub fn sync(&mut self, bundle: &Bundle) -> SyncResult<SyncReport> {
        if let Err(e) = bundle.validate() {
            warn!("Rejected {}: {}", bundle.describe(), e);
            return Err(e);
        }
        if bundle.is_empty() {
            debug!("Nothing to sync");
            return Ok(SyncReport::default());
        }

        let edges = bundle.checked_pedigree();
        let mut report = SyncReport {
            dropped_edges: bundle.pedigree.len() - edges.len(),
            ..Default::default()
        };

        let tx = self
            .store
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SyncError::from_write)?;
        write_bundle(&tx, bundle, &edges, &mut report).map_err(SyncError::from_write)?;
        tx.commit().map_err(SyncError::from_write)?;

        info!(
            "Synced {}: {} inserted, {} ignored, {} enriched",
            bundle.describe(),
            report.inserted,
            report.ignored,
            report.enriched
        );
        Ok(report)
    }
}

/// Referenced rows are written before the rows that reference them.
fn write_bundle(
    conn: &Connection,
    bundle: &Bundle,
    edges: &[&PedigreeEdge],
    report: &mut SyncReport,
) -> rusqlite::Result<()> {
    for owner in &bundle.owners {
        report.insert(insert_owner(conn, owner)?);
    }
    for breeder in &bundle.breeders {
        report.insert(insert_breeder(conn, breeder)?);
    }

    for (kind, records) in [
        (PersonKind::Trainer, &bundle.trainers),
        (PersonKind::Jockey, &bundle.jockeys),
    ] {
        for person in records {
            upsert_person(conn, kind, person, report)?;
        }
        for stub in person_stubs(bundle, kind) {
            upsert_person(conn, kind, &stub, report)?;
        }
    }

    for horse in &bundle.horses {
        upsert_horse(conn, horse, report)?;
    }
    for result in &bundle.results {
        if !bundle.horses.iter().any(|h| h.horse_id == result.horse_id) {
            upsert_horse(conn, &HorseRecord::stub(&result.horse_id), report)?;
        }
    }

    if let Some(race) = &bundle.race {
        report.insert(insert_race(conn, race, bundle.results.len())?);
    }
    for result in &bundle.results {
        report.insert(insert_result(conn, result)?);
    }

    for edge in edges {
        report.insert(insert_edge(conn, edge)?);
    }
    Ok(())
}

/// Jockeys/trainers referenced by results (and, for trainers, by horses)
/// that the bundle does not carry a record for.
fn person_stubs(bundle: &Bundle, kind: PersonKind) -> Vec<PersonRecord> {
    let carried = match kind {
        PersonKind::Jockey => &bundle.jockeys,
        PersonKind::Trainer => &bundle.trainers,
    };

    let mut stubs: BTreeMap<String, Option<String>> = BTreeMap::new();
    let mut add = |id: Option<&str>, name: Option<&str>| {
        let Some(id) = non_empty(id) else {
            return;
        };
        if carried.iter().any(|p| p.person_id == id) {
            return;
        }
        let slot = stubs.entry(id).or_default();
        if slot.is_none() {
            *slot = non_empty(name);
        }
    };

    for result in &bundle.results {
        match kind {
            PersonKind::Jockey => add(result.jockey_id.as_deref(), result.jockey_name.as_deref()),
            PersonKind::Trainer => {
                add(result.trainer_id.as_deref(), result.trainer_name.as_deref())
            }
        }
    }
    if kind == PersonKind::Trainer {
        for horse in &bundle.horses {
            add(horse.trainer_id.as_deref(), None);
        }
    }

    stubs
        .into_iter()
        .map(|(id, name)| PersonRecord::stub(id, name))
        .collect()
}

fn clean(value: &Option<String>) -> Option<String> {
    non_empty(value.as_deref())
}

/// `1980年3月5日` and `1980/03/05` are stored as `1980-03-05`, `2019年` as
/// `2019`; anything else is kept as given.
fn clean_birth_date(value: &Option<String>) -> Option<String> {
    clean(value).map(|raw| normalize::birth_date(&raw).unwrap_or(raw))
}

fn insert_race(conn: &Connection, race: &RaceRecord, result_count: usize) -> rusqlite::Result<bool> {
    let venue = clean(&race.venue).or_else(|| RaceId::venue(&race.race_id).map(str::to_string));
    let race_round = race.race_round.or_else(|| RaceId::round(&race.race_id));
    let entries = race
        .entries
        .or_else(|| (result_count > 0).then_some(result_count as u32));

    let rows = conn.execute(
        r#"
        INSERT INTO races
        (race_id, date, venue, race_class, race_name, race_round, course_type,
         rotation, distance, weather, state, entries)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT (race_id) DO NOTHING
        "#,
        params![
            race.race_id,
            race.date,
            venue,
            clean(&race.race_class),
            clean(&race.race_name),
            race_round,
            clean(&race.course_type),
            clean(&race.rotation),
            race.distance,
            clean(&race.weather),
            clean(&race.state),
            entries,
        ],
    )?;
    Ok(rows > 0)
}

fn insert_result(conn: &Connection, result: &ResultRecord) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        r#"
        INSERT INTO results
        (race_id, horse_id, rank, frame_no, horse_no, jockey_id, trainer_id, sex, age,
         weight, time_seconds, margin, passing, last_3f, odds, popularity,
         horse_weight, weight_diff)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        ON CONFLICT (race_id, horse_id) DO NOTHING
        "#,
        params![
            result.race_id,
            result.horse_id,
            result.rank,
            result.frame_no,
            result.horse_no,
            clean(&result.jockey_id),
            clean(&result.trainer_id),
            clean(&result.sex),
            result.age,
            result.weight,
            result.time_seconds,
            clean(&result.margin),
            clean(&result.passing),
            result.last_3f,
            result.odds,
            result.popularity,
            result.horse_weight,
            result.weight_diff,
        ],
    )?;
    Ok(rows > 0)
}

fn upsert_horse(conn: &Connection, horse: &HorseRecord, report: &mut SyncReport) -> rusqlite::Result<()> {
    let (name, birth_date, sex) = (
        clean(&horse.name),
        clean_birth_date(&horse.birth_date),
        clean(&horse.sex),
    );
    let (trainer_id, owner_id, breeder_id) = (
        clean(&horse.trainer_id),
        clean(&horse.owner_id),
        clean(&horse.breeder_id),
    );
    let values = params![horse.horse_id, name, birth_date, sex, trainer_id, owner_id, breeder_id];

    let inserted = conn.execute(
        r#"
        INSERT INTO horses (horse_id, name, birth_date, sex, trainer_id, owner_id, breeder_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (horse_id) DO NOTHING
        "#,
        values,
    )? > 0;
    report.insert(inserted);
    if inserted {
        return Ok(());
    }

    // At least one column must still be open for a value we have.
    let enriched = conn.execute(
        r#"
        UPDATE horses SET
            name = COALESCE(NULLIF(name, ''), ?2, name),
            birth_date = COALESCE(NULLIF(birth_date, ''), ?3, birth_date),
            sex = COALESCE(NULLIF(sex, ''), ?4, sex),
            trainer_id = COALESCE(NULLIF(trainer_id, ''), ?5, trainer_id),
            owner_id = COALESCE(NULLIF(owner_id, ''), ?6, owner_id),
            breeder_id = COALESCE(NULLIF(breeder_id, ''), ?7, breeder_id)
        WHERE horse_id = ?1
          AND ((NULLIF(name, '') IS NULL AND ?2 IS NOT NULL)
            OR (NULLIF(birth_date, '') IS NULL AND ?3 IS NOT NULL)
            OR (NULLIF(sex, '') IS NULL AND ?4 IS NOT NULL)
            OR (NULLIF(trainer_id, '') IS NULL AND ?5 IS NOT NULL)
            OR (NULLIF(owner_id, '') IS NULL AND ?6 IS NOT NULL)
            OR (NULLIF(breeder_id, '') IS NULL AND ?7 IS NOT NULL))
        "#,
        values,
    )? > 0;
    if enriched {
        debug!("Enriched horse {}", horse.horse_id);
    }
    report.enrich(enriched);
    Ok(())
}

fn upsert_person(
    conn: &Connection,
    kind: PersonKind,
    person: &PersonRecord,
    report: &mut SyncReport,
) -> rusqlite::Result<()> {
    let (name, belonging, birth_date) = (
        clean(&person.name),
        clean(&person.belonging),
        clean_birth_date(&person.birth_date),
    );
    let values = params![person.person_id, name, belonging, birth_date];
    let (table, id) = (kind.table(), kind.id_column());

    let inserted = conn.execute(
        &format!(
            "INSERT INTO {table} ({id}, name, belonging, birth_date) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT ({id}) DO NOTHING"
        ),
        values,
    )? > 0;
    report.insert(inserted);
    if inserted {
        return Ok(());
    }

    let enriched = conn.execute(
        &format!(
            "UPDATE {table} SET
                 name = COALESCE(NULLIF(name, ''), ?2, name),
                 belonging = COALESCE(NULLIF(belonging, ''), ?3, belonging),
                 birth_date = COALESCE(NULLIF(birth_date, ''), ?4, birth_date)
             WHERE {id} = ?1
               AND ((NULLIF(name, '') IS NULL AND ?2 IS NOT NULL)
                 OR (NULLIF(belonging, '') IS NULL AND ?3 IS NOT NULL)
                 OR (NULLIF(birth_date, '') IS NULL AND ?4 IS NOT NULL))"
        ),
        values,
    )? > 0;
    if enriched {
        debug!("Enriched {} {}", id, person.person_id);
    }
    report.enrich(enriched);
    Ok(())
}

fn insert_owner(conn: &Connection, owner: &OwnerRecord) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "INSERT INTO owners (owner_id, name, country) VALUES (?1, ?2, ?3)
         ON CONFLICT (owner_id) DO NOTHING",
        params![owner.owner_id, owner.name.trim(), clean(&owner.country)],
    )?;
    Ok(rows > 0)
}

fn insert_breeder(conn: &Connection, breeder: &BreederRecord) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "INSERT INTO breeders (breeder_id, name) VALUES (?1, ?2)
         ON CONFLICT (breeder_id) DO NOTHING",
        params![breeder.breeder_id, breeder.name.trim()],
    )?;
    Ok(rows > 0)
}

fn insert_edge(conn: &Connection, edge: &PedigreeEdge) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "INSERT INTO pedigrees (horse_id, position, ancestor_id, generation)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (horse_id, position) DO NOTHING",
        params![edge.horse_id, edge.position, edge.ancestor_id, edge.generation],
    )?;
    Ok(rows > 0)
}
