//! Persistence layer for hubly state
//!
//! Provides SQLite-backed storage for staff, tickets, messages, counters and
//! settings. Ticket writes are versioned so that concurrent writers on the
//! same database file never silently overwrite each other.

mod repository;
mod schema;

pub use repository::Repository;
pub use schema::{Schema, SCHEMA_VERSION};
