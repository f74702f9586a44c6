//! Exact price handling in integer minor units
//!
//! Prices travel through the system as `i64` minor units (the major value
//! scaled by 100). Parsing works on the decimal text directly so no binary
//! floating point rounding ever leaks into identity keys or sums.
//!
//! Rounding is half-up on the third fractional digit: `"0.005"` becomes `1`,
//! `"0.0049"` becomes `0`. Either `.` or `,` is accepted as the decimal
//! separator, at most once.
//!
//! A single price may not exceed [`MAX_PRICE_MINOR`]. Aggregates are summed
//! in `i128`, so population totals never wrap.

use thiserror::Error;

/// Minor units per major unit.
pub const MINOR_PER_MAJOR: i64 = 100;

/// Largest accepted price: `999999999.99`.
///
/// Every accepted price is exact as an `f64`.
pub const MAX_PRICE_MINOR: i64 = 99_999_999_999;

/// Reasons a price literal is refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceParseError {
    #[error("price is empty")]
    Empty,

    #[error("price is not a plain decimal number")]
    Malformed,

    #[error("price is out of range")]
    Overflow,

    #[error("price must be greater than zero")]
    NonPositive,
}

/// Parse price text into positive minor units.
///
/// Accepts an optional leading sign, digits, and one optional `.` or `,`
/// separator followed by digits. A value that rounds to zero or below is
/// rejected with [`PriceParseError::NonPositive`], one above
/// [`MAX_PRICE_MINOR`] with [`PriceParseError::Overflow`].
pub fn parse_minor_units(text: &str) -> Result<i64, PriceParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PriceParseError::Empty);
    }

    let (negative, body) = match text.as_bytes()[0] {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let mut parts = body.splitn(2, ['.', ',']);
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() && fraction.is_empty() {
        return Err(PriceParseError::Malformed);
    }
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(PriceParseError::Malformed);
    }

    let mut minor: i64 = 0;
    for digit in whole.bytes() {
        minor = minor
            .checked_mul(10)
            .and_then(|m| m.checked_add(i64::from(digit - b'0')))
            .ok_or(PriceParseError::Overflow)?;
    }
    minor = minor
        .checked_mul(MINOR_PER_MAJOR)
        .ok_or(PriceParseError::Overflow)?;

    let mut fraction_digits = fraction.bytes().map(|b| i64::from(b - b'0'));
    let tenths = fraction_digits.next().unwrap_or(0);
    let hundredths = fraction_digits.next().unwrap_or(0);
    let round_up = fraction_digits.next().is_some_and(|d| d >= 5);

    minor = minor
        .checked_add(tenths * 10 + hundredths + i64::from(round_up))
        .ok_or(PriceParseError::Overflow)?;

    if negative || minor <= 0 {
        return Err(PriceParseError::NonPositive);
    }
    if minor > MAX_PRICE_MINOR {
        return Err(PriceParseError::Overflow);
    }
    Ok(minor)
}

/// Render minor units with exactly two fractional digits.
pub fn format_minor_units(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let per_major = MINOR_PER_MAJOR.unsigned_abs();
    format!("{sign}{}.{:02}", abs / per_major, abs % per_major)
}

/// Convert minor units to a major-unit float for JSON responses.
///
/// Only used at the response boundary; all arithmetic stays in integers.
pub fn minor_to_major(minor: i128) -> f64 {
    minor as f64 / MINOR_PER_MAJOR as f64
}
