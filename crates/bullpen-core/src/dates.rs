// Appearance date grammar.
//
// Accepted: `YYYY-MM-DD` and `YYYY/MM/DD`, four-digit year first, one or two
// digit month and day, a single separator used consistently. Day-first and
// month-first forms are rejected outright so `01/02/2024` can never be read
// two ways.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("date '{0}' is not in YYYY-MM-DD or YYYY/MM/DD form")]
    Format(String),

    #[error("date '{0}' is not a valid calendar date")]
    OutOfRange(String),
}

/// Parse an appearance date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    let format_err = || DateParseError::Format(raw.to_string());

    let sep = if raw.contains('-') {
        '-'
    } else if raw.contains('/') {
        '/'
    } else {
        return Err(format_err());
    };

    let mut parts = raw.split(sep);
    let (Some(y), Some(m), Some(d), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format_err());
    };

    if !is_digits(y, 4, 4) || !is_digits(m, 1, 2) || !is_digits(d, 1, 2) {
        return Err(format_err());
    }

    // Digit-only segments of bounded width always fit.
    let year: i32 = y.parse().map_err(|_| format_err())?;
    let month: u32 = m.parse().map_err(|_| format_err())?;
    let day: u32 = d.parse().map_err(|_| format_err())?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DateParseError::OutOfRange(raw.to_string()))
}

fn is_digits(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}
