//! Storage layer for parkmark.
//!
//! This module provides `SQLite`-based persistent storage for parking
//! records, including the "exactly one current record" bookkeeping and the
//! synced/pending tracking used by the remote push.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::ParkingRecord;

/// Repository interface for parking records.
///
/// There is exactly one implementation ([`Storage`], backed by `SQLite`);
/// the trait keeps the seam between the command handlers and the database
/// explicit and lets tests substitute the store wholesale.
pub trait RecordStore {
    /// Insert a record and return its assigned id.
    ///
    /// Ids are assigned by the database and strictly increase.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn insert(&self, record: &ParkingRecord) -> Result<i64>;

    /// Get a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get(&self, id: i64) -> Result<Option<ParkingRecord>>;

    /// All records, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_all(&self) -> Result<Vec<ParkingRecord>>;

    /// Records not yet pushed to the remote collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_pending(&self) -> Result<Vec<ParkingRecord>>;

    /// The record the car is presently parked at, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn current(&self) -> Result<Option<ParkingRecord>>;

    /// Make `id` the current record.
    ///
    /// Clears the flag on every record, then sets it on `id`, as two
    /// sequential updates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if `id` does not exist, or an error
    /// if a database operation fails.
    fn mark_current(&self, id: i64) -> Result<()>;

    /// Set the current flag on one record without touching the others.
    ///
    /// Used to mark the vehicle as moved; `departure` stamps when that
    /// happened. Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn set_current_state(
        &self,
        id: i64,
        is_current: bool,
        departure: Option<&str>,
    ) -> Result<usize>;

    /// Record whether `id` has been pushed to the remote collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn set_synced(&self, id: i64, synced: bool) -> Result<usize>;

    /// Attach a photo path to a record. Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn update_photo(&self, id: i64, path: &str) -> Result<usize>;

    /// Fill in the reverse-geocoded address of a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn set_address(&self, id: i64, address: &str) -> Result<usize>;

    /// Delete one record. Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_one(&self, id: i64) -> Result<usize>;

    /// Delete every record. Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_all(&self) -> Result<usize>;

    /// Total number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count(&self) -> Result<i64>;

    /// Summary counters for the status view.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    fn stats(&self) -> Result<StoreStats>;
}

/// `SQLite`-backed record store.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// and upgrades the schema if the file was written by an older release.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps readers unblocked while a push marks rows synced.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert a database row to a `ParkingRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ParkingRecord> {
        Ok(ParkingRecord {
            id: Some(row.get(0)?),
            latitude: row.get(1)?,
            longitude: row.get(2)?,
            address: row.get(3)?,
            date: row.get(4)?,
            time: row.get(5)?,
            photo_path: row.get(6)?,
            departure: row.get(7)?,
            synced: row.get::<_, i32>(8)? != 0,
            is_current: row.get::<_, i32>(9)? != 0,
        })
    }
}

/// Column list matching [`Storage::row_to_record`].
const SELECT_COLUMNS: &str =
    "id, latitud, longitud, direccion, fecha, hora, fotoRuta, fechaHoraSalida, \
     sincronizado, esActual";

impl RecordStore for Storage {
    fn insert(&self, record: &ParkingRecord) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO ubicaciones
                (latitud, longitud, direccion, fecha, hora, fotoRuta, fechaHoraSalida,
                 sincronizado, esActual)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                record.latitude,
                record.longitude,
                record.address,
                record.date,
                record.time,
                record.photo_path,
                record.departure,
                i32::from(record.synced),
                i32::from(record.is_current),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted record with id {}", id);
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Option<ParkingRecord>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM ubicaciones WHERE id = ?1"),
                [id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(result)
    }

    fn list_all(&self) -> Result<Vec<ParkingRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM ubicaciones ORDER BY id ASC"))?;

        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn list_pending(&self) -> Result<Vec<ParkingRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM ubicaciones WHERE sincronizado = 0 ORDER BY id ASC"
        ))?;

        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn current(&self) -> Result<Option<ParkingRecord>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM ubicaciones WHERE esActual = 1 LIMIT 1"),
                [],
                Self::row_to_record,
            )
            .optional()?;
        Ok(result)
    }

    fn mark_current(&self, id: i64) -> Result<()> {
        // Two sequential updates: clear everywhere, then set the one row.
        self.conn
            .execute("UPDATE ubicaciones SET esActual = 0 WHERE esActual = 1", [])?;
        let affected = self
            .conn
            .execute("UPDATE ubicaciones SET esActual = 1 WHERE id = ?1", [id])?;

        if affected == 0 {
            return Err(Error::RecordNotFound { id });
        }
        debug!("Record {} marked current", id);
        Ok(())
    }

    fn set_current_state(
        &self,
        id: i64,
        is_current: bool,
        departure: Option<&str>,
    ) -> Result<usize> {
        let affected = if let Some(stamp) = departure {
            self.conn.execute(
                "UPDATE ubicaciones SET esActual = ?1, fechaHoraSalida = ?2 WHERE id = ?3",
                params![i32::from(is_current), stamp, id],
            )?
        } else {
            self.conn.execute(
                "UPDATE ubicaciones SET esActual = ?1 WHERE id = ?2",
                params![i32::from(is_current), id],
            )?
        };
        Ok(affected)
    }

    fn set_synced(&self, id: i64, synced: bool) -> Result<usize> {
        let affected = self.conn.execute(
            "UPDATE ubicaciones SET sincronizado = ?1 WHERE id = ?2",
            params![i32::from(synced), id],
        )?;
        Ok(affected)
    }

    fn update_photo(&self, id: i64, path: &str) -> Result<usize> {
        let affected = self.conn.execute(
            "UPDATE ubicaciones SET fotoRuta = ?1 WHERE id = ?2",
            params![path, id],
        )?;
        Ok(affected)
    }

    fn set_address(&self, id: i64, address: &str) -> Result<usize> {
        let affected = self.conn.execute(
            "UPDATE ubicaciones SET direccion = ?1 WHERE id = ?2",
            params![address, id],
        )?;
        Ok(affected)
    }

    fn delete_one(&self, id: i64) -> Result<usize> {
        let affected = self
            .conn
            .execute("DELETE FROM ubicaciones WHERE id = ?1", [id])?;
        Ok(affected)
    }

    fn delete_all(&self) -> Result<usize> {
        let affected = self.conn.execute("DELETE FROM ubicaciones", [])?;
        if affected > 0 {
            info!("Deleted {} records", affected);
        }
        Ok(affected)
    }

    fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ubicaciones", [], |row| row.get(0))?;
        Ok(count)
    }

    fn stats(&self) -> Result<StoreStats> {
        let total_records = self.count()?;

        let pending_records: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM ubicaciones WHERE sincronizado = 0",
            [],
            |row| row.get(0),
        )?;

        let current_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM ubicaciones WHERE esActual = 1 LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            total_records,
            pending_records,
            current_id,
            db_size_bytes,
        })
    }
}

/// Statistics about the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Total number of records stored.
    pub total_records: i64,
    /// Records not yet pushed to the remote collection.
    pub pending_records: i64,
    /// Id of the current record, if one exists.
    pub current_id: Option<i64>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
