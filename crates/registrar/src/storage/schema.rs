//! Table definitions. Every statement is idempotent.

/// SQL statement to create the registrants table.
///
/// `seq` records insertion order independently of the assigned `id`.
pub const CREATE_REGISTRANTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS registrants (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    phone INTEGER NOT NULL UNIQUE,
    department TEXT NOT NULL,
    registered_at TEXT NOT NULL
)
";

/// Key-value table; holds the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_REGISTRANTS_TABLE, CREATE_METADATA_TABLE];
