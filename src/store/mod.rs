//! Generation store implementations.
//!
//! [`memory::MemoryStore`] keeps an arena of immutable snapshots for tests
//! and ephemeral runs; [`sqlite::SqliteStore`] adds SQLite durability in
//! front of the same arena.

pub mod db;
pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
