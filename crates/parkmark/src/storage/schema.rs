//! `SQLite` schema definitions for parkmark.
//!
//! Column names in the `ubicaciones` table date back to the first release of
//! the app and are kept unchanged so existing databases keep loading.

/// Name of the locations table.
pub const TABLE_LOCATIONS: &str = "ubicaciones";

/// SQL statement to create the locations table.
///
/// This is the version-1 layout; the `sincronizado` and `esActual` columns
/// are added by later migrations.
pub const CREATE_LOCATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS ubicaciones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    latitud REAL,
    longitud REAL,
    direccion TEXT,
    fecha TEXT,
    hora TEXT,
    fotoRuta TEXT,
    fechaHoraSalida TEXT
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Base schema statements, executed on every open.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_LOCATIONS_TABLE, CREATE_METADATA_TABLE];

/// Migration step 2: track which rows have been pushed to the remote store.
pub const ADD_SYNCED_COLUMN: &str =
    "ALTER TABLE ubicaciones ADD COLUMN sincronizado INTEGER NOT NULL DEFAULT 0";

/// Index to speed up the pending-rows lookup.
pub const CREATE_SYNCED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_ubicaciones_sincronizado ON ubicaciones(sincronizado)";

/// Migration step 3: flag the row the car is presently parked at.
pub const ADD_CURRENT_COLUMN: &str =
    "ALTER TABLE ubicaciones ADD COLUMN esActual INTEGER NOT NULL DEFAULT 0";

/// Index for the current-row lookup.
pub const CREATE_CURRENT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_ubicaciones_esActual ON ubicaciones(esActual)";
