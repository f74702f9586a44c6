//! Row validation and normalization
//!
//! Turns one raw CSV record (`id, name, category, price, create_date`) into a
//! [`CanonicalRecord`] or a [`RejectReason`]. Pure: no store access, no
//! knowledge of other rows.

use pricekeep_common::money::{parse_minor_units, PriceParseError};
use pricekeep_common::types::parse_calendar_date;
use pricekeep_common::CanonicalRecord;
use serde::Serialize;

/// Number of columns in an upload row.
pub const FIELD_COUNT: usize = 5;

/// Why a row was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    FieldCount,
    EmptyField,
    ControlCharacter,
    InvalidPrice,
    NonPositivePrice,
    InvalidDate,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::FieldCount => "field_count",
            RejectReason::EmptyField => "empty_field",
            RejectReason::ControlCharacter => "control_character",
            RejectReason::InvalidPrice => "invalid_price",
            RejectReason::NonPositivePrice => "non_positive_price",
            RejectReason::InvalidDate => "invalid_date",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped fields of one upload row, in file column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord<'a> {
    fields: Vec<&'a str>,
}

impl<'a> RawRecord<'a> {
    pub fn new(fields: Vec<&'a str>) -> Self {
        Self { fields }
    }
}

impl<'a> From<&'a csv::StringRecord> for RawRecord<'a> {
    fn from(record: &'a csv::StringRecord) -> Self {
        Self::new(record.iter().collect())
    }
}

/// Validate and normalize one row.
pub fn normalize(raw: &RawRecord<'_>) -> Result<CanonicalRecord, RejectReason> {
    let [external_id, name, category, price, date] = raw.fields.as_slice() else {
        return Err(RejectReason::FieldCount);
    };

    let (external_id, name, category, price, date) = (
        external_id.trim(),
        name.trim(),
        category.trim(),
        price.trim(),
        date.trim(),
    );

    let fields = [external_id, name, category, price, date];
    if fields.iter().any(|f| f.is_empty()) {
        return Err(RejectReason::EmptyField);
    }
    // TEXT columns cannot hold NUL; other control characters go with it
    if fields.iter().any(|f| f.chars().any(char::is_control)) {
        return Err(RejectReason::ControlCharacter);
    }

    let price_minor = parse_minor_units(price).map_err(|e| match e {
        PriceParseError::NonPositive => RejectReason::NonPositivePrice,
        PriceParseError::Empty | PriceParseError::Malformed | PriceParseError::Overflow => {
            RejectReason::InvalidPrice
        },
    })?;

    let date = parse_calendar_date(date).map_err(|_| RejectReason::InvalidDate)?;

    Ok(CanonicalRecord {
        external_id: external_id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        price_minor,
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(fields: &[&'static str]) -> RawRecord<'static> {
        RawRecord::new(fields.to_vec())
    }

    #[test]
    fn test_valid_row_is_trimmed_and_scaled() {
        let record = normalize(&row(&[" 7 ", " Milk ", "Dairy ", "12.50", "2024-01-15"])).unwrap();
        assert_eq!(record.external_id, "7");
        assert_eq!(record.name, "Milk");
        assert_eq!(record.category, "Dairy");
        assert_eq!(record.price_minor, 1250);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_decimal_comma() {
        let comma = normalize(&row(&["1", "Milk", "Dairy", "12,50", "2024-01-15"])).unwrap();
        let period = normalize(&row(&["1", "Milk", "Dairy", "12.50", "2024-01-15"])).unwrap();
        assert_eq!(comma.price_minor, period.price_minor);
    }

    #[test]
    fn test_field_count() {
        assert_eq!(
            normalize(&row(&["1", "Milk", "Dairy", "12.50"])),
            Err(RejectReason::FieldCount)
        );
        assert_eq!(
            normalize(&row(&["1", "Milk", "Dairy", "12.50", "2024-01-15", "extra"])),
            Err(RejectReason::FieldCount)
        );
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(
            normalize(&row(&["  ", "Milk", "Dairy", "1", "2024-01-15"])),
            Err(RejectReason::EmptyField)
        );
        assert_eq!(
            normalize(&row(&["1", "Milk", "", "1", "2024-01-15"])),
            Err(RejectReason::EmptyField)
        );
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(
            normalize(&row(&["1", "Mi\0lk", "Dairy", "1.00", "2024-01-15"])),
            Err(RejectReason::ControlCharacter)
        );
        assert_eq!(
            normalize(&row(&["1", "Milk", "Dai\u{7}ry", "1.00", "2024-01-15"])),
            Err(RejectReason::ControlCharacter)
        );
        assert_eq!(
            normalize(&row(&["1\r\n2", "Milk", "Dairy", "1.00", "2024-01-15"])),
            Err(RejectReason::ControlCharacter)
        );
        // Surrounding whitespace is trimmed before the check
        assert!(normalize(&row(&["1", "Milk\t", "Dairy", "1.00", "2024-01-15"])).is_ok());
    }

    #[test]
    fn test_price_above_ceiling() {
        assert!(normalize(&row(&["1", "Milk", "Dairy", "999999999.99", "2024-01-15"])).is_ok());
        assert_eq!(
            normalize(&row(&["1", "Milk", "Dairy", "1000000000.00", "2024-01-15"])),
            Err(RejectReason::InvalidPrice)
        );
    }

    #[test]
    fn test_bad_prices() {
        assert_eq!(
            normalize(&row(&["1", "Milk", "Dairy", "twelve", "2024-01-15"])),
            Err(RejectReason::InvalidPrice)
        );
        assert_eq!(
            normalize(&row(&["1", "Milk", "Dairy", "0", "2024-01-15"])),
            Err(RejectReason::NonPositivePrice)
        );
        assert_eq!(
            normalize(&row(&["1", "Milk", "Dairy", "-3.00", "2024-01-15"])),
            Err(RejectReason::NonPositivePrice)
        );
    }

    #[test]
    fn test_bad_dates() {
        for date in ["2024-13-01", "2024/01/15", "15-01-2024", "2024-01-15 10:00"] {
            assert_eq!(
                normalize(&row(&["1", "Milk", "Dairy", "1.00", date])),
                Err(RejectReason::InvalidDate),
                "{date}"
            );
        }
    }

    #[test]
    fn test_from_string_record() {
        let record = csv::StringRecord::from(vec!["1", "Milk", "Dairy", "1.00", "2024-01-15"]);
        assert!(normalize(&RawRecord::from(&record)).is_ok());
    }
}
