//! Work discovery from store state alone.
//!
//! There is no todo ledger: each query below derives outstanding work from
//! what the store lacks, so re-running after an interrupted pass yields a
//! smaller set.

use std::collections::BTreeSet;

use rusqlite::{Connection, Params};
use serde::Serialize;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::storage::Store;
use crate::types::PersonKind;

/// Outstanding units of work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkSet {
    pub horses_needing_profile: BTreeSet<String>,
    pub horses_missing_pedigree: BTreeSet<String>,
    pub jockeys_needing_detail: BTreeSet<String>,
    pub trainers_needing_detail: BTreeSet<String>,
}

impl WorkSet {
    pub fn total(&self) -> usize {
        self.horses_needing_profile.len()
            + self.horses_missing_pedigree.len()
            + self.jockeys_needing_detail.len()
            + self.trainers_needing_detail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn persons_needing_detail(&self, kind: PersonKind) -> &BTreeSet<String> {
        match kind {
            PersonKind::Jockey => &self.jockeys_needing_detail,
            PersonKind::Trainer => &self.trainers_needing_detail,
        }
    }
}

/// Read-only queries over the store.
pub struct Reconciler<'a> {
    conn: &'a Connection,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { conn: store.conn() }
    }

    fn ids<P: Params>(&self, sql: &str, params: P) -> SyncResult<BTreeSet<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params, |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;
        Ok(ids)
    }

    /// Horses referenced by a result but never persisted, plus stub rows.
    pub fn horses_needing_profile(&self) -> SyncResult<BTreeSet<String>> {
        self.ids(
            r#"
            SELECT r.horse_id
            FROM results r
            LEFT JOIN horses h ON h.horse_id = r.horse_id
            WHERE h.horse_id IS NULL AND r.horse_id <> ''
            UNION
            SELECT horse_id FROM horses WHERE name IS NULL OR name = ''
            "#,
            [],
        )
    }

    /// Complete horses with no pedigree edge at all.
    pub fn horses_missing_pedigree(&self) -> SyncResult<BTreeSet<String>> {
        self.ids(
            r#"
            SELECT h.horse_id
            FROM horses h
            WHERE h.name IS NOT NULL AND h.name <> ''
              AND NOT EXISTS (SELECT 1 FROM pedigrees p WHERE p.horse_id = h.horse_id)
            "#,
            [],
        )
    }

    /// Jockeys or trainers whose row still lacks a birth date (NULL or empty).
    pub fn persons_needing_detail(&self, kind: PersonKind) -> SyncResult<BTreeSet<String>> {
        let sql = format!(
            "SELECT {id} FROM {table} WHERE NULLIF(birth_date, '') IS NULL",
            id = kind.id_column(),
            table = kind.table(),
        );
        self.ids(&sql, [])
    }

    /// Race ids already stored whose id starts with `prefix` (usually a year).
    pub fn races_already_present(&self, prefix: &str) -> SyncResult<BTreeSet<String>> {
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SyncError::InvalidArgument(format!(
                "race id prefix {prefix:?} must be digits"
            )));
        }
        self.ids(
            "SELECT race_id FROM races WHERE substr(race_id, 1, length(?1)) = ?1",
            [prefix],
        )
    }

    pub fn reconcile(&self) -> SyncResult<WorkSet> {
        let work = WorkSet {
            horses_needing_profile: self.horses_needing_profile()?,
            horses_missing_pedigree: self.horses_missing_pedigree()?,
            jockeys_needing_detail: self.persons_needing_detail(PersonKind::Jockey)?,
            trainers_needing_detail: self.persons_needing_detail(PersonKind::Trainer)?,
        };
        debug!(
            "Reconciled: {} profiles, {} pedigrees, {} jockeys, {} trainers",
            work.horses_needing_profile.len(),
            work.horses_missing_pedigree.len(),
            work.jockeys_needing_detail.len(),
            work.trainers_needing_detail.len()
        );
        Ok(work)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(store: &Store, sql: &str) {
        store.conn().execute_batch(sql).unwrap();
    }

    #[test]
    fn test_empty_store_has_no_work() {
        let store = Store::in_memory().unwrap();
        let work = Reconciler::new(&store).reconcile().unwrap();
        assert!(work.is_empty());
    }

    #[test]
    fn test_result_without_horse_row_needs_profile() {
        let store = Store::in_memory().unwrap();
        // Rows written by an older run with foreign keys off.
        seed(
            &store,
            "PRAGMA foreign_keys = OFF;
             INSERT INTO races (race_id) VALUES ('202401010101');
             INSERT INTO results (race_id, horse_id) VALUES ('202401010101', 'H1');
             INSERT INTO results (race_id, horse_id) VALUES ('202401010101', '');
             PRAGMA foreign_keys = ON;",
        );
        let reconciler = Reconciler::new(&store);
        let ids = reconciler.horses_needing_profile().unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["H1"]);
    }

    #[test]
    fn test_stub_and_complete_horses() {
        let store = Store::in_memory().unwrap();
        seed(
            &store,
            "INSERT INTO horses (horse_id) VALUES ('STUB');
             INSERT INTO horses (horse_id, name) VALUES ('EMPTY', '');
             INSERT INTO horses (horse_id, name) VALUES ('DONE', 'Done');
             INSERT INTO horses (horse_id, name) VALUES ('BARE', 'Bare');
             INSERT INTO pedigrees (horse_id, position, ancestor_id, generation)
                 VALUES ('DONE', 'f', 'S', 1);",
        );
        let reconciler = Reconciler::new(&store);
        let profile: Vec<String> = reconciler.horses_needing_profile().unwrap().into_iter().collect();
        assert_eq!(profile, vec!["EMPTY", "STUB"]);
        let pedigree: Vec<String> =
            reconciler.horses_missing_pedigree().unwrap().into_iter().collect();
        assert_eq!(pedigree, vec!["BARE"]);
    }

    #[test]
    fn test_persons_needing_detail() {
        let store = Store::in_memory().unwrap();
        seed(
            &store,
            "INSERT INTO jockeys (jockey_id, name) VALUES ('J1', 'Stub');
             INSERT INTO jockeys (jockey_id, name, birth_date) VALUES ('J2', 'Known', '1980-01-01');
             INSERT INTO jockeys (jockey_id, name, birth_date) VALUES ('J3', 'Blank', '');
             INSERT INTO trainers (trainer_id) VALUES ('T1');",
        );
        let work = Reconciler::new(&store).reconcile().unwrap();
        assert_eq!(work.jockeys_needing_detail.len(), 2);
        assert!(work.persons_needing_detail(PersonKind::Jockey).contains("J1"));
        assert!(work.persons_needing_detail(PersonKind::Jockey).contains("J3"));
        assert!(work.persons_needing_detail(PersonKind::Trainer).contains("T1"));
    }

    #[test]
    fn test_races_already_present() {
        let store = Store::in_memory().unwrap();
        seed(
            &store,
            "INSERT INTO races (race_id) VALUES ('202301010101');
             INSERT INTO races (race_id) VALUES ('202401010101');
             INSERT INTO races (race_id) VALUES ('202401010102');",
        );
        let reconciler = Reconciler::new(&store);
        assert_eq!(reconciler.races_already_present("2024").unwrap().len(), 2);
        assert_eq!(reconciler.races_already_present("2022").unwrap().len(), 0);
        assert!(matches!(
            reconciler.races_already_present("20%"),
            Err(SyncError::InvalidArgument(_))
        ));
    }
}
