//! Domain types shared by the ingestion and export paths

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CommonError;

/// Date format accepted on input and produced on output.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` calendar date.
///
/// chrono alone accepts unpadded fields such as `2024-1-5`, so the shape is
/// checked first.
pub fn parse_calendar_date(text: &str) -> Result<NaiveDate, CommonError> {
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());

    if !shaped {
        return Err(CommonError::Date(text.to_string()));
    }

    NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|_| CommonError::Date(text.to_string()))
}

/// A validated, normalized price row.
///
/// `external_id` is carried along for storage but takes no part in identity;
/// see [`IdentityKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub external_id: String,
    pub name: String,
    pub category: String,
    pub price_minor: i64,
    pub date: NaiveDate,
}

impl CanonicalRecord {
    /// Business identity of this record.
    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            date: self.date,
            name: self.name.clone(),
            category: self.category.clone(),
            price_minor: self.price_minor,
        }
    }
}

/// `(date, name, category, price)`: two records with equal keys are the same
/// economic fact regardless of their external identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub date: NaiveDate,
    pub name: String,
    pub category: String,
    pub price_minor: i64,
}

/// A stored price row with its surrogate identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    /// Assigned by the store at insertion time
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price_minor: i64,
    pub date: NaiveDate,
}

impl PersistedRecord {
    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            date: self.date,
            name: self.name.clone(),
            category: self.category.clone(),
            price_minor: self.price_minor,
        }
    }
}
