//! The event record shared by storage, expansion, and the codec.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

use super::duration::parse_duration;
use super::recurrence::Recurrence;

const MAX_TITLE_LEN: usize = 500;
const MAX_DESCRIPTION_LEN: usize = 10_000;
const MAX_LOCATION_LEN: usize = 500;
const MAX_CATEGORIES_LEN: usize = 500;
const MAX_URL_LEN: usize = 2_000;
/// Four weeks.
const MAX_REMINDER_MINUTES: u32 = 40_320;
const MAX_EVENT_DAYS: i64 = 366;
const MIN_YEAR: i32 = 1970;
const MAX_YEAR: i32 = 2200;

/// Geographic position attached to an event.
///
/// Latitude and longitude always travel together; an event either has a
/// full position or none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Reference from an override to its parent series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRef {
    /// The parent's stored row id.
    Stored(i64),
    /// The parent's iCalendar UID; used to correlate freshly decoded
    /// overrides to their parent within one decode batch, before storage
    /// has assigned ids.
    Uid(String),
}

/// Recurrence role of an event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A plain, non-recurring event.
    Single,
    /// The base definition of a recurring series.
    Series(Recurrence),
    /// A stored replacement for one occurrence of a series.
    Override {
        parent: ParentRef,
        /// The start instant, in the parent's unmodified series, that this
        /// override replaces.
        original_start: DateTime<Utc>,
    },
}

/// The unit of both storage and expansion.
///
/// Instants are absolute UTC; all-day events are midnight-aligned with an
/// exclusive end. Expansion produces transient copies of this type with
/// `start`/`end` replaced and `id` carrying the parent's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Storage-assigned id; `None` until persisted.
    pub id: Option<i64>,
    pub title: String,
    /// Free text, sanitized externally before it reaches the core.
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub color: String,
    pub location: String,
    pub geo: Option<GeoPoint>,
    /// Comma-separated category list.
    pub categories: String,
    pub url: String,
    /// Verbatim ISO 8601 duration; when set, the encoder emits DURATION
    /// instead of DTEND.
    pub duration: Option<String>,
    /// Minutes before start for the display alarm; 0 means no reminder.
    pub reminder_minutes: u32,
    pub kind: EventKind,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Decode-only correlation key for matching overrides to parents in
    /// one import batch; never persisted.
    #[serde(skip)]
    pub import_uid: Option<String>,
}

impl Event {
    /// Creates a plain event with the given title and times.
    #[must_use]
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            start,
            end,
            all_day: false,
            color: String::new(),
            location: String::new(),
            geo: None,
            categories: String::new(),
            url: String::new(),
            duration: None,
            reminder_minutes: 0,
            kind: EventKind::Single,
            created_at: None,
            updated_at: None,
            import_uid: None,
        }
    }

    /// Whether this event is the base definition of a recurring series.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        matches!(self.kind, EventKind::Series(_))
    }

    /// Whether this event replaces one occurrence of a series.
    #[must_use]
    pub fn is_override(&self) -> bool {
        matches!(self.kind, EventKind::Override { .. })
    }

    /// Returns the recurrence rule for series events.
    #[must_use]
    pub fn recurrence(&self) -> Option<&Recurrence> {
        match &self.kind {
            EventKind::Series(rule) => Some(rule),
            EventKind::Single | EventKind::Override { .. } => None,
        }
    }

    /// The event's time span.
    #[must_use]
    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// Validates the record against the model limits.
    ///
    /// ## Errors
    /// Returns `CoreError::ValidationError` describing the first violation.
    pub fn validate(&self) -> CoreResult<()> {
        if self.title.is_empty() {
            return Err(CoreError::ValidationError("title is required".into()));
        }
        if self.title.len() > MAX_TITLE_LEN {
            return Err(CoreError::ValidationError(format!(
                "title must be at most {MAX_TITLE_LEN} characters"
            )));
        }
        if self.description.len() > MAX_DESCRIPTION_LEN {
            return Err(CoreError::ValidationError(format!(
                "description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        if self.location.len() > MAX_LOCATION_LEN {
            return Err(CoreError::ValidationError(format!(
                "location must be at most {MAX_LOCATION_LEN} characters"
            )));
        }
        if self.categories.len() > MAX_CATEGORIES_LEN {
            return Err(CoreError::ValidationError(format!(
                "categories must be at most {MAX_CATEGORIES_LEN} characters"
            )));
        }
        self.validate_url()?;
        if self.end <= self.start {
            return Err(CoreError::ValidationError(
                "end must be after start".into(),
            ));
        }
        if self.end - self.start > Duration::days(MAX_EVENT_DAYS) {
            return Err(CoreError::ValidationError(format!(
                "event duration must not exceed {MAX_EVENT_DAYS} days"
            )));
        }
        for instant in [self.start, self.end] {
            let year = instant.year();
            if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                return Err(CoreError::ValidationError(format!(
                    "date must be between year {MIN_YEAR} and {MAX_YEAR}"
                )));
            }
        }
        if self.reminder_minutes > MAX_REMINDER_MINUTES {
            return Err(CoreError::ValidationError(format!(
                "reminder minutes must be at most {MAX_REMINDER_MINUTES}"
            )));
        }
        if let Some(geo) = self.geo {
            if !(-90.0..=90.0).contains(&geo.latitude) {
                return Err(CoreError::ValidationError(
                    "latitude must be between -90 and 90".into(),
                ));
            }
            if !(-180.0..=180.0).contains(&geo.longitude) {
                return Err(CoreError::ValidationError(
                    "longitude must be between -180 and 180".into(),
                ));
            }
        }
        if let Some(duration) = self.duration.as_deref() {
            if !duration.is_empty() {
                parse_duration(duration)?;
            }
        }
        if let EventKind::Series(rule) = &self.kind {
            rule.validate()?;
        }
        Ok(())
    }

    fn validate_url(&self) -> CoreResult<()> {
        if self.url.is_empty() {
            return Ok(());
        }
        if self.url.len() > MAX_URL_LEN {
            return Err(CoreError::ValidationError(format!(
                "url must be at most {MAX_URL_LEN} characters"
            )));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(CoreError::ValidationError(
                "url must start with http:// or https://".into(),
            ));
        }
        Ok(())
    }
}
