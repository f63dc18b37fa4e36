//! Core registrant types for registrar.
//!
//! This module defines the data structures for a registration: the fixed
//! department catalogue, the validated submission and the stored record.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The field of study a registrant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    /// Computer Science and Engineering.
    Cse,
    /// Electronics and Communication Engineering.
    Ece,
    /// Mechanical Engineering.
    Mech,
    /// Civil Engineering.
    Civil,
    /// Chemical Engineering.
    Chem,
    /// Anything else.
    Others,
}

impl Department {
    /// Every department, in form order.
    pub const ALL: [Self; 6] = [
        Self::Cse,
        Self::Ece,
        Self::Mech,
        Self::Civil,
        Self::Chem,
        Self::Others,
    ];

    /// The short code submitted by the registration form.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Cse => "cse",
            Self::Ece => "ece",
            Self::Mech => "mech",
            Self::Civil => "civil",
            Self::Chem => "chem",
            Self::Others => "others",
        }
    }

    /// The human-readable name that is stored and displayed.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Cse => "Computer Science and Engineering",
            Self::Ece => "Electronics and Communication Engineering",
            Self::Mech => "Mechanical Engineering",
            Self::Civil => "Civil Engineering",
            Self::Chem => "Chemical Engineering",
            Self::Others => "Others",
        }
    }

    /// Look up a department by its stored display name.
    #[must_use]
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.display_name() == name)
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Department {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.code() == code)
            .ok_or_else(|| Error::UnknownDepartment(code.to_string()))
    }
}

/// Parse a submitted phone number into its stored integer form.
///
/// # Errors
///
/// Returns [`Error::InvalidPhone`] if the input is not a non-negative integer.
pub fn parse_phone(raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPhone(raw.to_string()));
    }
    trimmed
        .parse()
        .map_err(|_| Error::InvalidPhone(raw.to_string()))
}

/// A validated submission that has not been assigned an ID yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistrant {
    /// Full name.
    pub name: String,
    /// Email address, unique across registrants.
    pub email: String,
    /// Phone number, unique across registrants.
    pub phone: i64,
    /// Department the registrant belongs to.
    pub department: Department,
}

impl NewRegistrant {
    /// Build a submission from raw form values.
    ///
    /// # Errors
    ///
    /// Returns an error if the phone number is not an integer or the
    /// department code is unknown.
    pub fn from_form(name: &str, email: &str, phone: &str, department: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: parse_phone(phone)?,
            department: department.parse()?,
        })
    }

    /// Attach an ID, producing the record to persist.
    #[must_use]
    pub fn with_id(self, id: i64) -> Registrant {
        Registrant {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            department: self.department,
            registered_at: Utc::now(),
        }
    }
}

/// A persisted registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    /// Sequential registration ID.
    pub id: i64,
    /// Full name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Phone number.
    pub phone: i64,
    /// Department.
    pub department: Department,
    /// When the registration was stored.
    pub registered_at: DateTime<Utc>,
}
