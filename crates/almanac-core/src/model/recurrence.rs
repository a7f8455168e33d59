//! Recurrence rule types (RFC 5545 RECUR subset).
//!
//! The supported rule parts are FREQ, INTERVAL, COUNT, UNTIL, BYDAY,
//! BYMONTHDAY and BYMONTH. COUNT and UNTIL are mutually exclusive, which
//! [`RecurrenceLimit`] enforces structurally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

const MAX_INTERVAL: u32 = 999;
const MAX_COUNT: u32 = 1000;
const MAX_BYDAY_ORDINAL: i8 = 53;

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Parses a frequency token (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Returns the RFC 5545 token for this frequency.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day of the week, carrying the RFC 5545 two-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Parses a two-letter weekday code (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MO" => Some(Self::Monday),
            "TU" => Some(Self::Tuesday),
            "WE" => Some(Self::Wednesday),
            "TH" => Some(Self::Thursday),
            "FR" => Some(Self::Friday),
            "SA" => Some(Self::Saturday),
            "SU" => Some(Self::Sunday),
            _ => None,
        }
    }

    /// Returns the two-letter RFC 5545 code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
            Self::Sunday => "SU",
        }
    }

    /// Days since Monday, 0..=6. Matches `chrono::Weekday`'s convention.
    #[must_use]
    pub const fn num_days_from_monday(self) -> u32 {
        match self {
            Self::Monday => 0,
            Self::Tuesday => 1,
            Self::Wednesday => 2,
            Self::Thursday => 3,
            Self::Friday => 4,
            Self::Saturday => 5,
            Self::Sunday => 6,
        }
    }

    /// Whether this weekday is the same day as a `chrono` weekday.
    #[must_use]
    pub fn matches(self, other: chrono::Weekday) -> bool {
        self.num_days_from_monday() == other.num_days_from_monday()
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A BYDAY entry: a weekday with an optional signed ordinal.
///
/// `2MO` is the second Monday, `-1FR` the last Friday, plain `MO` every
/// Monday in the frequency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekdayNum {
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Parses an entry like `MO`, `2MO` or `-1FR`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() < 2 {
            return None;
        }
        let weekday = Weekday::parse(&s[s.len() - 2..])?;
        let ordinal_str = &s[..s.len() - 2];
        let ordinal = if ordinal_str.is_empty() {
            None
        } else {
            Some(ordinal_str.parse::<i8>().ok()?)
        };
        Some(Self { ordinal, weekday })
    }
}

impl std::fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ordinal {
            Some(n) => write!(f, "{n}{}", self.weekday),
            None => write!(f, "{}", self.weekday),
        }
    }
}

/// Series termination: an occurrence count or an inclusive end instant.
///
/// RFC 5545 forbids COUNT and UNTIL together; a single enum value cannot
/// hold both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceLimit {
    Count(u32),
    Until(DateTime<Utc>),
}

/// A recurrence rule together with its exception and addition sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub freq: Frequency,
    /// Step between base occurrences, in units of `freq`. At least 1.
    pub interval: u32,
    pub limit: Option<RecurrenceLimit>,
    pub by_day: Vec<WeekdayNum>,
    /// Signed days of month, -31..=31 excluding 0; negative counts from
    /// the end of the month.
    pub by_month_day: Vec<i8>,
    /// Months 1..=12.
    pub by_month: Vec<u8>,
    /// Start instants excluded from the series (EXDATE).
    pub ex_dates: Vec<DateTime<Utc>>,
    /// Start instants added to the series (RDATE).
    pub r_dates: Vec<DateTime<Utc>>,
}

impl Recurrence {
    /// Creates a rule with the given frequency and no other constraints.
    #[must_use]
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: 1,
            limit: None,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
            ex_dates: Vec::new(),
            r_dates: Vec::new(),
        }
    }

    /// Whether any BY* selector is set.
    #[must_use]
    pub fn has_selectors(&self) -> bool {
        !self.by_day.is_empty() || !self.by_month_day.is_empty() || !self.by_month.is_empty()
    }

    /// Validates the rule fields against their allowed ranges.
    ///
    /// ## Errors
    /// Returns `CoreError::ValidationError` describing the first violation.
    pub fn validate(&self) -> CoreResult<()> {
        if self.interval < 1 {
            return Err(CoreError::ValidationError(
                "recurrence interval must be at least 1".into(),
            ));
        }
        if self.interval > MAX_INTERVAL {
            return Err(CoreError::ValidationError(format!(
                "recurrence interval must be at most {MAX_INTERVAL}"
            )));
        }
        if let Some(RecurrenceLimit::Count(count)) = self.limit {
            if count > MAX_COUNT {
                return Err(CoreError::ValidationError(format!(
                    "recurrence count must be at most {MAX_COUNT}"
                )));
            }
        }
        for entry in &self.by_day {
            if let Some(ordinal) = entry.ordinal {
                if ordinal == 0 || ordinal.abs() > MAX_BYDAY_ORDINAL {
                    return Err(CoreError::ValidationError(format!(
                        "BYDAY ordinal must be between -{MAX_BYDAY_ORDINAL} and {MAX_BYDAY_ORDINAL}, not zero"
                    )));
                }
            }
        }
        for &day in &self.by_month_day {
            if day == 0 || day.abs() > 31 {
                return Err(CoreError::ValidationError(
                    "BYMONTHDAY values must be between -31 and 31, not zero".into(),
                ));
            }
        }
        for &month in &self.by_month {
            if !(1..=12).contains(&month) {
                return Err(CoreError::ValidationError(
                    "BYMONTH values must be between 1 and 12".into(),
                ));
            }
        }
        Ok(())
    }
}
