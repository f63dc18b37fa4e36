//! Storage layer for registrar.
//!
//! This module provides `SQLite`-based persistent storage for registrants,
//! including the sequential ID assignment and the uniqueness guarantees on
//! email and phone number.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::error::{Error, Result, UniqueField};
use crate::registrant::{Department, NewRegistrant, Registrant};

const SELECT_COLUMNS: &str =
    "SELECT id, name, email, phone, department, registered_at FROM registrants";

/// Storage engine for registrants.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Raw inserts guarded by UNIQUE constraints
/// - Atomic check-assign-insert registration
/// - Listing in insertion order
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
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
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

    /// Insert a registrant that already carries its ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageConflict`] if a UNIQUE constraint (id, email or
    /// phone) rejects the row, or another error if the database operation fails.
    pub fn insert(&self, registrant: &Registrant) -> Result<()> {
        insert_row(&self.conn, registrant)
    }

    /// All registrants in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_all(&self) -> Result<Vec<Registrant>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY seq ASC"))?;
        let registrants = stmt
            .query_map([], row_to_registrant)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(registrants)
    }

    /// The ID the next registrant will receive.
    ///
    /// This is the ID of the most recently inserted row plus one, or 1 when
    /// the table is empty. It assumes rows are never deleted or reordered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn next_id(&self) -> Result<i64> {
        next_id(&self.conn)
    }

    /// Report which unique field, if any, an existing registrant already uses.
    ///
    /// Email is checked before phone.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_duplicate(&self, email: &str, phone: i64) -> Result<Option<UniqueField>> {
        find_duplicate(&self.conn, email, phone)
    }

    /// Whether any registrant already uses `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn email_registered(&self, email: &str) -> Result<bool> {
        email_registered(&self.conn, email)
    }

    /// Check uniqueness, assign an ID and insert, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] naming the colliding field when the email
    /// or phone number is taken, [`Error::StorageConflict`] if the insert is
    /// still rejected by a constraint, or another error if the database
    /// operation fails.
    pub fn register(&mut self, new: NewRegistrant) -> Result<Registrant> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        match find_duplicate(&tx, &new.email, new.phone)? {
            Some(UniqueField::Email) => {
                return Err(Error::duplicate(UniqueField::Email, new.email));
            }
            Some(UniqueField::Phone) => {
                return Err(Error::duplicate(UniqueField::Phone, new.phone.to_string()));
            }
            None => {}
        }

        let registrant = new.with_id(next_id(&tx)?);
        insert_row(&tx, &registrant)?;
        tx.commit()?;

        debug!("Committed registrant {} with id {}", registrant.email, registrant.id);
        Ok(registrant)
    }

    /// Get a registrant by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<Registrant>> {
        let result = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id],
                row_to_registrant,
            )
            .optional()?;
        Ok(result)
    }

    /// Count total registrants in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM registrants", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_registrants = self.count()?;

        let latest: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, registered_at FROM registrants ORDER BY seq DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (last_id, latest_registration) = match latest {
            Some((id, at)) => (
                Some(id),
                DateTime::parse_from_rfc3339(&at)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc)),
            ),
            None => (None, None),
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_registrants,
            last_id,
            latest_registration,
            db_size_bytes,
        })
    }
}

fn next_id(conn: &Connection) -> Result<i64> {
    let last: Option<i64> = conn
        .query_row(
            "SELECT id FROM registrants ORDER BY seq DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(last.unwrap_or(0) + 1)
}

fn email_registered(conn: &Connection, email: &str) -> Result<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM registrants WHERE email = ?1)",
        [email],
        |row| row.get(0),
    )?;
    Ok(taken)
}

fn find_duplicate(conn: &Connection, email: &str, phone: i64) -> Result<Option<UniqueField>> {
    if email_registered(conn, email)? {
        return Ok(Some(UniqueField::Email));
    }

    let phone_taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM registrants WHERE phone = ?1)",
        [phone],
        |row| row.get(0),
    )?;
    Ok(phone_taken.then_some(UniqueField::Phone))
}

fn insert_row(conn: &Connection, registrant: &Registrant) -> Result<()> {
    let result = conn.execute(
        r"
        INSERT INTO registrants (id, name, email, phone, department, registered_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
        params![
            registrant.id,
            registrant.name,
            registrant.email,
            registrant.phone,
            registrant.department.display_name(),
            registrant.registered_at.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => {
            debug!("Inserted registrant with id {}", registrant.id);
            Ok(())
        }
        Err(err) if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
            warn!("Insert of registrant {} rejected: {}", registrant.id, err);
            Err(Error::StorageConflict {
                message: err.to_string(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Convert a database row to a Registrant struct.
fn row_to_registrant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Registrant> {
    let id: i64 = row.get(0)?;
    let name: String = row.get(1)?;
    let email: String = row.get(2)?;
    let phone: i64 = row.get(3)?;
    let department_str: String = row.get(4)?;
    let registered_at_str: String = row.get(5)?;

    let department = Department::from_display_name(&department_str).unwrap_or_else(|| {
        warn!(
            "Unknown department: {}, defaulting to {}",
            department_str,
            Department::Others
        );
        Department::Others
    });

    let registered_at = DateTime::parse_from_rfc3339(&registered_at_str)
        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

    Ok(Registrant {
        id,
        name,
        email,
        phone,
        department,
        registered_at,
    })
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of registrants stored.
    pub total_registrants: i64,
    /// ID of the most recently inserted registrant.
    pub last_id: Option<i64>,
    /// When the most recent registration was stored.
    pub latest_registration: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// A [`Storage`] shared between request handlers.
///
/// Every call takes the lock on the blocking thread pool so the async
/// runtime is never blocked on `SQLite`.
#[derive(Debug, Clone)]
pub struct SharedStorage {
    inner: Arc<Mutex<Storage>>,
}

impl SharedStorage {
    /// Wrap a storage instance for sharing.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(storage)),
        }
    }

    /// Run `f` with exclusive access to the storage.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or an internal error if the lock is
    /// poisoned or the blocking task fails.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Storage) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut storage = inner
                .lock()
                .map_err(|_| Error::internal("storage lock poisoned"))?;
            f(&mut *storage)
        })
        .await
        .map_err(|e| Error::internal(format!("storage task failed: {e}")))?
    }
}
