//! `registrar` - event registration with QR code tickets
//!
//! Attendees fill in a web form; each registration is stored in `SQLite`,
//! given a sequential ID and a QR code, and confirmed by email through
//! `SendGrid`. Organisers can list registrants behind a username/password
//! form.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mail;
pub mod qr;
pub mod registrant;
pub mod storage;
pub mod web;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use mail::{Notifier, SendGridNotifier};
pub use registrant::{Department, NewRegistrant, Registrant};
pub use storage::{SharedStorage, Storage, StorageStats};
pub use web::{router, AppState};
