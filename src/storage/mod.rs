//! Persistent state storage.
//!
//! The seen-item ledger lives in a single SQLite table. Uniqueness of a
//! record's link and content hash is enforced by the schema, so a duplicate
//! insert can never race its own existence check.

mod sqlite;

pub use sqlite::{SeenRecord, SeenStore};
