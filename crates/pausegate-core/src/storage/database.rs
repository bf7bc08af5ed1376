//! SQLite key-value storage.
//!
//! The engine keeps its whole durable state as one JSON document in the
//! `kv` table, so every event is a single read and a single write.

use std::path::Path;

use rusqlite::{params, Connection};

use super::data_dir;
use super::state_store::StateStore;
use crate::error::{DatabaseError, Result};

const ENGINE_STATE_KEY: &str = "engine_state";

/// SQLite database holding the persisted engine state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/pausegate.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("pausegate.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a key from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl StateStore for Database {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.kv_get(ENGINE_STATE_KEY)?)
    }

    fn write(&self, document: &str) -> Result<()> {
        self.kv_set(ENGINE_STATE_KEY, document)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.kv_delete(ENGINE_STATE_KEY)?;
        Ok(())
    }
}
