//! Error types for registrar.
//!
//! This module defines all error types used throughout the registrar crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// A registrant field that must be unique across the whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueField {
    /// The registrant's email address.
    Email,
    /// The registrant's phone number.
    Phone,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
        }
    }
}

/// The main error type for registrar operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A registrant with the same unique field value already exists.
    #[error("{field} {value} is already registered")]
    Duplicate {
        /// Which field collided.
        field: UniqueField,
        /// The submitted value.
        value: String,
    },

    /// The database rejected an insert because of a uniqueness constraint.
    #[error("storage conflict: {message}")]
    StorageConflict {
        /// The constraint message reported by the database.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Registration Input Errors ===
    /// The submitted department code is not one of the known codes.
    #[error("unknown department code: {0}")]
    UnknownDepartment(String),

    /// The submitted phone number is not an integer.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    // === Code Generation Errors ===
    /// The payload could not be encoded as a QR code.
    #[error("QR encoding failed: {0}")]
    QrEncode(#[from] qrcode::types::QrError),

    /// The rendered QR code could not be written as PNG.
    #[error("image encoding failed: {0}")]
    ImageEncode(#[from] image::ImageError),

    // === Mail Errors ===
    /// The request to the mail provider could not be completed.
    #[error("mail transport failed: {0}")]
    MailTransport(#[from] reqwest::Error),

    /// The mail provider answered with a non-success status.
    #[error("mail provider rejected message with status {status}: {body}")]
    MailRejected {
        /// HTTP status returned by the provider.
        status: u16,
        /// Response body returned by the provider.
        body: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for registrar operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a duplicate-field error.
    #[must_use]
    pub fn duplicate(field: UniqueField, value: impl Into<String>) -> Self {
        Self::Duplicate {
            field,
            value: value.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error is an application-level duplicate.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Check if this error was caused by the submitted form and can be shown
    /// to the submitter as is.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Duplicate { .. }
                | Self::StorageConflict { .. }
                | Self::UnknownDepartment(_)
                | Self::InvalidPhone(_)
        )
    }
}
