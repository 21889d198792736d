//! SQLite store: connection setup and point lookups by primary key

use std::path::Path;
use std::time::Duration;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use super::schema::create_tables;
use crate::error::SyncResult;
use crate::pedigree::PositionLabel;
use crate::types::{
    BreederRecord, HorseRecord, OwnerRecord, PedigreeEdge, PersonKind, PersonRecord, RaceRecord,
    ResultRecord,
};

impl ToSql for PositionLabel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PositionLabel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        PositionLabel::parse(text).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub races: i64,
    pub results: i64,
    pub horses: i64,
    pub incomplete_horses: i64,
    pub pedigree_edges: i64,
    pub jockeys: i64,
    pub trainers: i64,
    pub owners: i64,
    pub breeders: i64,
}

/// The race/pedigree store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a file-backed store, initializing the schema if needed
    pub fn open(db_path: &Path, busy_timeout: Duration) -> SyncResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.busy_timeout(busy_timeout)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        create_tables(&conn)?;

        debug!("Opened store at {} (journal_mode={})", db_path.display(), mode);
        Ok(Self { conn })
    }

    /// Create an in-memory store
    pub fn in_memory() -> SyncResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // ==================== Point Lookups ====================

    pub fn race(&self, race_id: &str) -> SyncResult<Option<RaceRecord>> {
        let race = self
            .conn
            .query_row(
                r#"
                SELECT race_id, date, venue, race_class, race_name, race_round,
                       course_type, rotation, distance, weather, state, entries
                FROM races WHERE race_id = ?1
                "#,
                [race_id],
                |row| {
                    Ok(RaceRecord {
                        race_id: row.get(0)?,
                        date: row.get(1)?,
                        venue: row.get(2)?,
                        race_class: row.get(3)?,
                        race_name: row.get(4)?,
                        race_round: row.get(5)?,
                        course_type: row.get(6)?,
                        rotation: row.get(7)?,
                        distance: row.get(8)?,
                        weather: row.get(9)?,
                        state: row.get(10)?,
                        entries: row.get(11)?,
                    })
                },
            )
            .optional()?;
        Ok(race)
    }

    pub fn result(&self, race_id: &str, horse_id: &str) -> SyncResult<Option<ResultRecord>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT race_id, horse_id, rank, frame_no, horse_no, jockey_id, trainer_id,
                       sex, age, weight, time_seconds, margin, passing, last_3f, odds,
                       popularity, horse_weight, weight_diff
                FROM results WHERE race_id = ?1 AND horse_id = ?2
                "#,
                params![race_id, horse_id],
                Self::row_to_result,
            )
            .optional()?;
        Ok(result)
    }

    /// Results of one race, in finishing order (unplaced runners last)
    pub fn race_results(&self, race_id: &str) -> SyncResult<Vec<ResultRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT race_id, horse_id, rank, frame_no, horse_no, jockey_id, trainer_id,
                   sex, age, weight, time_seconds, margin, passing, last_3f, odds,
                   popularity, horse_weight, weight_diff
            FROM results WHERE race_id = ?1
            ORDER BY rank IS NULL, rank, horse_no
            "#,
        )?;
        let results = stmt
            .query_map([race_id], Self::row_to_result)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(results)
    }

    fn row_to_result(row: &Row) -> rusqlite::Result<ResultRecord> {
        Ok(ResultRecord {
            race_id: row.get(0)?,
            horse_id: row.get(1)?,
            rank: row.get(2)?,
            frame_no: row.get(3)?,
            horse_no: row.get(4)?,
            jockey_id: row.get(5)?,
            jockey_name: None,
            trainer_id: row.get(6)?,
            trainer_name: None,
            sex: row.get(7)?,
            age: row.get(8)?,
            weight: row.get(9)?,
            time_seconds: row.get(10)?,
            margin: row.get(11)?,
            passing: row.get(12)?,
            last_3f: row.get(13)?,
            odds: row.get(14)?,
            popularity: row.get(15)?,
            horse_weight: row.get(16)?,
            weight_diff: row.get(17)?,
        })
    }

    pub fn horse(&self, horse_id: &str) -> SyncResult<Option<HorseRecord>> {
        let horse = self
            .conn
            .query_row(
                r#"
                SELECT horse_id, name, birth_date, sex, trainer_id, owner_id, breeder_id
                FROM horses WHERE horse_id = ?1
                "#,
                [horse_id],
                |row| {
                    Ok(HorseRecord {
                        horse_id: row.get(0)?,
                        name: row.get(1)?,
                        birth_date: row.get(2)?,
                        sex: row.get(3)?,
                        trainer_id: row.get(4)?,
                        owner_id: row.get(5)?,
                        breeder_id: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(horse)
    }

    pub fn person(&self, kind: PersonKind, person_id: &str) -> SyncResult<Option<PersonRecord>> {
        let sql = format!(
            "SELECT {id}, name, belonging, birth_date FROM {table} WHERE {id} = ?1",
            id = kind.id_column(),
            table = kind.table(),
        );
        let person = self
            .conn
            .query_row(&sql, [person_id], |row| {
                Ok(PersonRecord {
                    person_id: row.get(0)?,
                    name: row.get(1)?,
                    belonging: row.get(2)?,
                    birth_date: row.get(3)?,
                })
            })
            .optional()?;
        Ok(person)
    }

    pub fn owner(&self, owner_id: &str) -> SyncResult<Option<OwnerRecord>> {
        let owner = self
            .conn
            .query_row(
                "SELECT owner_id, name, country FROM owners WHERE owner_id = ?1",
                [owner_id],
                |row| {
                    Ok(OwnerRecord {
                        owner_id: row.get(0)?,
                        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        country: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(owner)
    }

    pub fn breeder(&self, breeder_id: &str) -> SyncResult<Option<BreederRecord>> {
        let breeder = self
            .conn
            .query_row(
                "SELECT breeder_id, name FROM breeders WHERE breeder_id = ?1",
                [breeder_id],
                |row| {
                    Ok(BreederRecord {
                        breeder_id: row.get(0)?,
                        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(breeder)
    }

    /// Pedigree edges of a horse in canonical slot order
    pub fn pedigree(&self, horse_id: &str) -> SyncResult<Vec<PedigreeEdge>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT horse_id, ancestor_id, generation, position
            FROM pedigrees WHERE horse_id = ?1
            ORDER BY generation, position
            "#,
        )?;
        let edges = stmt
            .query_map([horse_id], |row| {
                Ok(PedigreeEdge {
                    horse_id: row.get(0)?,
                    ancestor_id: row.get(1)?,
                    generation: row.get(2)?,
                    position: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    // ==================== Summary ====================

    fn count(&self, sql: &str) -> SyncResult<i64> {
        Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
    }

    pub fn summary(&self) -> SyncResult<StoreSummary> {
        Ok(StoreSummary {
            races: self.count("SELECT COUNT(*) FROM races")?,
            results: self.count("SELECT COUNT(*) FROM results")?,
            horses: self.count("SELECT COUNT(*) FROM horses")?,
            incomplete_horses: self
                .count("SELECT COUNT(*) FROM horses WHERE name IS NULL OR name = ''")?,
            pedigree_edges: self.count("SELECT COUNT(*) FROM pedigrees")?,
            jockeys: self.count("SELECT COUNT(*) FROM jockeys")?,
            trainers: self.count("SELECT COUNT(*) FROM trainers")?,
            owners: self.count("SELECT COUNT(*) FROM owners")?,
            breeders: self.count("SELECT COUNT(*) FROM breeders")?,
        })
    }
}
