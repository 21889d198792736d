//! SQLite schema for the race/pedigree store
//!
//! Tables:
//! - races: Race headers, written once
//! - results: One row per runner, keyed by (race_id, horse_id)
//! - horses: Horse profiles; a row with no name is a stub
//! - pedigrees: Ancestor slots, keyed by (horse_id, position)
//! - jockeys / trainers: Person profiles; stubs until birth_date is known
//! - owners / breeders: Written complete on first sight

use rusqlite::{Connection, Result};

/// Create all tables in the database
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS races (
            race_id TEXT PRIMARY KEY,
            date TEXT,
            venue TEXT,
            race_class TEXT,
            race_name TEXT,
            race_round INTEGER,
            course_type TEXT,
            rotation TEXT,
            distance INTEGER,
            weather TEXT,
            state TEXT,
            entries INTEGER
        );

        CREATE TABLE IF NOT EXISTS jockeys (
            jockey_id TEXT PRIMARY KEY,
            name TEXT,
            belonging TEXT,
            birth_date TEXT
        );

        CREATE TABLE IF NOT EXISTS trainers (
            trainer_id TEXT PRIMARY KEY,
            name TEXT,
            belonging TEXT,
            birth_date TEXT
        );

        CREATE TABLE IF NOT EXISTS owners (
            owner_id TEXT PRIMARY KEY,
            name TEXT,
            country TEXT
        );

        CREATE TABLE IF NOT EXISTS breeders (
            breeder_id TEXT PRIMARY KEY,
            name TEXT
        );

        CREATE TABLE IF NOT EXISTS horses (
            horse_id TEXT PRIMARY KEY,
            name TEXT,
            birth_date TEXT,
            sex TEXT,
            trainer_id TEXT REFERENCES trainers(trainer_id),
            owner_id TEXT REFERENCES owners(owner_id),
            breeder_id TEXT REFERENCES breeders(breeder_id)
        );

        CREATE TABLE IF NOT EXISTS results (
            race_id TEXT NOT NULL REFERENCES races(race_id),
            horse_id TEXT NOT NULL REFERENCES horses(horse_id),
            rank INTEGER,
            frame_no INTEGER,
            horse_no INTEGER,
            jockey_id TEXT REFERENCES jockeys(jockey_id),
            trainer_id TEXT REFERENCES trainers(trainer_id),
            sex TEXT,
            age INTEGER,
            weight REAL,
            time_seconds REAL,
            margin TEXT,
            passing TEXT,
            last_3f REAL,
            odds REAL,
            popularity INTEGER,
            horse_weight INTEGER,
            weight_diff INTEGER,
            PRIMARY KEY (race_id, horse_id)
        );

        -- ancestor_id is not a foreign key: ancestors are
        -- recorded by id and never become horse rows of their own.
        CREATE TABLE IF NOT EXISTS pedigrees (
            horse_id TEXT NOT NULL REFERENCES horses(horse_id),
            position TEXT NOT NULL,
            ancestor_id TEXT NOT NULL,
            generation INTEGER NOT NULL
                CHECK (generation BETWEEN 1 AND 5 AND generation = length(position)),
            PRIMARY KEY (horse_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_results_horse ON results(horse_id);
        CREATE INDEX IF NOT EXISTS idx_results_jockey ON results(jockey_id);
        CREATE INDEX IF NOT EXISTS idx_results_trainer ON results(trainer_id);
        CREATE INDEX IF NOT EXISTS idx_races_date ON races(date);
        CREATE INDEX IF NOT EXISTS idx_pedigrees_ancestor ON pedigrees(ancestor_id);
        "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_create_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                 ('races', 'results', 'horses', 'pedigrees',
                  'jockeys', 'trainers', 'owners', 'breeders')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 8);
    }

    #[test]
    fn test_create_tables_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // Should not fail on second call
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_pedigree_generation_check() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute("INSERT INTO horses (horse_id) VALUES ('H1')", [])
            .unwrap();

        conn.execute(
            "INSERT INTO pedigrees (horse_id, position, ancestor_id, generation)
             VALUES ('H1', 'fm', 'A', 2)",
            [],
        )
        .unwrap();
        let mismatch = conn.execute(
            "INSERT INTO pedigrees (horse_id, position, ancestor_id, generation)
             VALUES ('H1', 'mf', 'B', 3)",
            [],
        );
        assert!(mismatch.is_err());
    }
}
