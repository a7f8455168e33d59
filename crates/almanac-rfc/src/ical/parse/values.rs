//! Primitive value parsers for iCalendar (RFC 5545 §3.3).
//!
//! Value-level failures are not anchored to document positions: a value
//! that does not parse makes its event malformed, and malformed events are
//! dropped rather than reported. The parsers therefore return bare
//! [`ParseErrorKind`]s.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use super::error::ParseErrorKind;

/// Parses a DATE value (RFC 5545 §3.3.4), `YYYYMMDD`.
///
/// ## Errors
/// Returns an error if the string is not a valid 8-digit date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ParseErrorKind> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseErrorKind::InvalidDate);
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| ParseErrorKind::InvalidDate)
}

/// Parses a local (floating) DATE-TIME value, `YYYYMMDDTHHMMSS`.
///
/// ## Errors
/// Returns an error if the string is not a valid datetime.
pub fn parse_naive_datetime(s: &str) -> Result<NaiveDateTime, ParseErrorKind> {
    NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").map_err(|_| ParseErrorKind::InvalidDateTime)
}

/// Parses a UTC DATE-TIME value, `YYYYMMDDTHHMMSSZ`.
///
/// ## Errors
/// Returns an error if the string is not a valid UTC datetime.
pub fn parse_utc_datetime(s: &str) -> Result<DateTime<Utc>, ParseErrorKind> {
    let Some(naive) = s.strip_suffix('Z') else {
        return Err(ParseErrorKind::InvalidDateTime);
    };
    parse_naive_datetime(naive).map(|dt| dt.and_utc())
}

/// Parses a UTC-OFFSET value (RFC 5545 §3.3.14), `(+|-)HHMM[SS]`.
///
/// ## Errors
/// Returns an error if the string is not a valid offset.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset, ParseErrorKind> {
    if s.len() < 5 || !s.is_ascii() {
        return Err(ParseErrorKind::InvalidUtcOffset);
    }

    let sign = match s.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Err(ParseErrorKind::InvalidUtcOffset),
    };

    let hours: i32 = s[1..3].parse().map_err(|_| ParseErrorKind::InvalidUtcOffset)?;
    let minutes: i32 = s[3..5].parse().map_err(|_| ParseErrorKind::InvalidUtcOffset)?;
    let seconds: i32 = if s.len() >= 7 {
        s[5..7].parse().map_err(|_| ParseErrorKind::InvalidUtcOffset)?
    } else {
        0
    };

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60 + seconds))
        .ok_or(ParseErrorKind::InvalidUtcOffset)
}

/// Unescapes a TEXT value (RFC 5545 §3.3.11): `\\` `\,` `\;` `\n` `\N`.
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => result.push('\n'),
            Some(',') => result.push(','),
            Some(';') => result.push(';'),
            Some('\\') | None => result.push('\\'),
            Some(other) => {
                // Unknown escape, preserve as-is.
                result.push('\\');
                result.push(other);
            }
        }
    }

    result
}
