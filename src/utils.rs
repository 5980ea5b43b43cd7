//! Utility functions for date handling and response excerpts

use crate::error::{Error, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Format used for transcript timestamps
pub const TRANSCRIPT_TIME_FORMAT: &str = "%d/%m/%Y @ %H:%M:%S";

/// Parse a cutoff date given as `dd/mm/YYYY` or `dd/mm/YYYY@HH:MM:SS`
///
/// The date is interpreted in the given time zone; a bare date means midnight.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use inbox_dl::utils::parse_cutoff_in;
///
/// let cutoff = parse_cutoff_in("01/02/2024@13:30:00", &Utc).unwrap();
/// assert_eq!(cutoff.to_rfc3339(), "2024-02-01T13:30:00+00:00");
/// ```
pub fn parse_cutoff_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    let invalid = || Error::InvalidDate {
        input: input.to_string(),
    };

    let naive = if trimmed.contains('@') {
        NaiveDateTime::parse_from_str(trimmed, "%d/%m/%Y@%H:%M:%S").map_err(|_| invalid())?
    } else {
        NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
            .map_err(|_| invalid())?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(invalid)?
    };

    // DST gaps have no local representation; ambiguous times take the earlier instant
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

/// Parse a cutoff date in the local time zone
pub fn parse_cutoff(input: &str) -> Result<DateTime<Utc>> {
    parse_cutoff_in(input, &Local)
}

/// Render a microsecond timestamp in the transcript format
///
/// Out-of-range timestamps render as the raw number.
pub fn format_timestamp_in<Tz>(micros: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match DateTime::from_timestamp_micros(micros) {
        Some(utc) => utc
            .with_timezone(tz)
            .format(TRANSCRIPT_TIME_FORMAT)
            .to_string(),
        None => micros.to_string(),
    }
}

/// Shorten a response body for error messages, respecting UTF-8 boundaries
pub fn excerpt(body: &str, max_bytes: usize) -> &str {
    let body = body.trim();
    if body.len() <= max_bytes {
        return body;
    }
    let cut = body
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= max_bytes)
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &body[..cut]
}
