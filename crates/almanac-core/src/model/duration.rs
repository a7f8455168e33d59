//! ISO 8601 duration codec (RFC 5545 §3.3.6 subset).
//!
//! Accepted forms: `P[n]W`, `P[n]D`, `PT[n]H[n]M[n]S` and combinations
//! such as `P1DT2H30M`. The sign is not part of this grammar; callers that
//! deal with negative durations (alarm triggers) strip it first.

use chrono::Duration;

use crate::error::{CoreError, CoreResult};

/// Parses an ISO 8601 duration string into a time span.
///
/// ## Errors
/// Returns `CoreError::ValidationError` if the string is not a valid
/// duration or the total is zero or negative.
pub fn parse_duration(s: &str) -> CoreResult<Duration> {
    if s.is_empty() {
        return Err(CoreError::ValidationError("empty duration".into()));
    }
    let upper = s.to_ascii_uppercase();
    let Some(body) = upper.strip_prefix('P') else {
        return Err(CoreError::ValidationError(format!(
            "duration must start with P: {s:?}"
        )));
    };

    let mut total = Duration::zero();
    let mut in_time = false;
    let mut num = String::new();

    for c in body.chars() {
        if c == 'T' {
            if !num.is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "dangling number in duration: {s:?}"
                )));
            }
            in_time = true;
            continue;
        }
        if c.is_ascii_digit() {
            num.push(c);
            continue;
        }
        let n: i64 = num.parse().map_err(|_| {
            CoreError::ValidationError(format!("invalid duration number in {s:?}"))
        })?;
        num.clear();
        let component = match (c, in_time) {
            ('W', false) => Duration::weeks(n),
            ('D', false) => Duration::days(n),
            ('H', true) => Duration::hours(n),
            ('M', true) => Duration::minutes(n),
            ('S', true) => Duration::seconds(n),
            _ => {
                return Err(CoreError::ValidationError(format!(
                    "unknown duration unit {c:?} in {s:?}"
                )));
            }
        };
        total = total + component;
    }

    if !num.is_empty() {
        return Err(CoreError::ValidationError(format!(
            "dangling number in duration: {s:?}"
        )));
    }
    if total <= Duration::zero() {
        return Err(CoreError::ValidationError(
            "duration must be positive".into(),
        ));
    }
    Ok(total)
}
