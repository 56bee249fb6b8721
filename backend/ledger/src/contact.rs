//! # Contacts
//!
//! A contact is never edited in place: it is created by an add, and destroyed by
//! a delete referencing its store-assigned id.
//!
//! ## Schema
//!
//! - name (**string**): trimmed, non-empty, at most 200 characters
//! - phone (**string**): digits plus `+ - ( )` and spaces, at least one digit, at most 32 characters
//! - email (**string**): `local@domain.tld`, stored as typed (only trimmed)
//!
//! Validation happens here, at the ledger boundary, so every backend only ever
//! sees a [`ValidContact`].
use std::{fmt, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::LedgerError, identity::Email};

const MAX_NAME_LEN: usize = 200;
const MAX_PHONE_LEN: usize = 32;

static PHONE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-() ]+$").expect("phone pattern compiles"));

pub type RecordId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Phone,
    Email,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Name => "name",
            Field::Phone => "phone",
            Field::Email => "email",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: RecordId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Unchecked contact fields as submitted by a form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl NewContact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<ValidContact, LedgerError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(invalid(Field::Name, "is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(invalid(Field::Name, "is too long"));
        }

        let phone = self.phone.trim();
        if phone.is_empty() {
            return Err(invalid(Field::Phone, "is required"));
        }
        if phone.len() > MAX_PHONE_LEN {
            return Err(invalid(Field::Phone, "is too long"));
        }
        if !PHONE_SHAPE.is_match(phone) {
            return Err(invalid(Field::Phone, "may only contain digits, spaces and + - ( )"));
        }
        if !phone.chars().any(|c| c.is_ascii_digit()) {
            return Err(invalid(Field::Phone, "must contain a digit"));
        }

        let email = self.email.trim();
        if email.is_empty() {
            return Err(invalid(Field::Email, "is required"));
        }
        if Email::parse(email).is_none() {
            return Err(invalid(Field::Email, "is malformed"));
        }

        Ok(ValidContact {
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
        })
    }
}

fn invalid(field: Field, reason: &'static str) -> LedgerError {
    LedgerError::InvalidContact { field, reason }
}

/// Contact fields that passed [`NewContact::validate`]. Only a store turns it into
/// a [`ContactRecord`], by assigning the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidContact {
    name: String,
    phone: String,
    email: String,
}

impl ValidContact {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> ContactRecord {
        ContactRecord {
            id,
            name: self.name,
            phone: self.phone,
            email: self.email,
            created_at,
        }
    }
}
