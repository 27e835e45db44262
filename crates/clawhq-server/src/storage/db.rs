//! `SQLite` database for the `ClawHQ` hub.

pub use clawhq_core::db::DatabaseError;

clawhq_core::define_database!(HubDatabase, "Hub database migrations complete");
