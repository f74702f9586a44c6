//! Typed read predicates for the export path

use chrono::NaiveDate;
use pricekeep_common::money::format_minor_units;
use pricekeep_common::PersistedRecord;
use serde::Serialize;

fn money(minor: &i64) -> String {
    format_minor_units(*minor)
}

/// Inverted export bounds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputRangeError {
    #[error("start date {from} is after end date {to}")]
    Dates { from: NaiveDate, to: NaiveDate },

    #[error("min price {} is greater than max price {}", money(.from), money(.to))]
    Prices { from: i64, to: i64 },
}

/// Four independent, inclusive, optional bounds on persisted prices.
///
/// Only constructible through [`PriceFilter::new`], so a filter in hand is
/// never inverted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriceFilter {
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    price_from: Option<i64>,
    price_to: Option<i64>,
}

impl PriceFilter {
    pub fn new(
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        price_from: Option<i64>,
        price_to: Option<i64>,
    ) -> Result<Self, InputRangeError> {
        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(InputRangeError::Dates { from, to });
            }
        }
        if let (Some(from), Some(to)) = (price_from, price_to) {
            if from > to {
                return Err(InputRangeError::Prices { from, to });
            }
        }

        Ok(Self {
            date_from,
            date_to,
            price_from,
            price_to,
        })
    }

    /// Filter with no bounds at all.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn date_from(&self) -> Option<NaiveDate> {
        self.date_from
    }

    pub fn date_to(&self) -> Option<NaiveDate> {
        self.date_to
    }

    pub fn price_from(&self) -> Option<i64> {
        self.price_from
    }

    pub fn price_to(&self) -> Option<i64> {
        self.price_to
    }

    pub fn matches(&self, record: &PersistedRecord) -> bool {
        self.date_from.map_or(true, |from| record.date >= from)
            && self.date_to.map_or(true, |to| record.date <= to)
            && self.price_from.map_or(true, |from| record.price_minor >= from)
            && self.price_to.map_or(true, |to| record.price_minor <= to)
    }
}
