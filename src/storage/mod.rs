//! SQLite storage for races, results, profiles and pedigrees.

pub mod repository;
pub mod schema;

pub use repository::{Store, StoreSummary};
pub use schema::create_tables;
