//! iCalendar decoding: component tree to [`Event`] records.
//!
//! One decoded VEVENT either becomes a parent event (optionally a series)
//! or, when RECURRENCE-ID is present, an override correlated to its parent
//! by UID. A VEVENT lacking SUMMARY, DTSTART, or a resolvable
//! DTEND/DURATION is dropped; decoding fails only when the document itself
//! is structurally unreadable.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use almanac_core::model::{
    Event, EventKind, Frequency, GeoPoint, ParentRef, Recurrence, RecurrenceLimit, WeekdayNum,
    parse_duration,
};

use crate::error::RfcResult;
use crate::ical::core::{Component, ContentLine};
use crate::ical::parse::{self, values};
use crate::ical::timezone::TzResolver;

/// The VEVENT properties this decoder interprets.
///
/// Everything else falls through to [`EventProp::Other`] and is ignored,
/// which keeps the decoder open to unrecognized and future properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventProp {
    Summary,
    Description,
    Location,
    Categories,
    Url,
    Color,
    Geo,
    DtStart,
    DtEnd,
    Duration,
    RRule,
    ExDate,
    RDate,
    RecurrenceId,
    Uid,
    Created,
    LastModified,
    Other,
}

impl EventProp {
    /// Maps a (lexer-uppercased) property name onto the enumeration.
    fn parse(name: &str) -> Self {
        match name {
            "SUMMARY" => Self::Summary,
            "DESCRIPTION" => Self::Description,
            "LOCATION" => Self::Location,
            "CATEGORIES" => Self::Categories,
            "URL" => Self::Url,
            "COLOR" => Self::Color,
            "GEO" => Self::Geo,
            "DTSTART" => Self::DtStart,
            "DTEND" => Self::DtEnd,
            "DURATION" => Self::Duration,
            "RRULE" => Self::RRule,
            "EXDATE" => Self::ExDate,
            "RDATE" => Self::RDate,
            "RECURRENCE-ID" => Self::RecurrenceId,
            "UID" => Self::Uid,
            "CREATED" => Self::Created,
            "LAST-MODIFIED" => Self::LastModified,
            _ => Self::Other,
        }
    }
}

/// Decodes an iCalendar document into event records.
///
/// Overrides reference their parents by UID ([`ParentRef::Uid`]); id
/// assignment and the UID-to-id rewrite happen at import, outside the
/// codec.
///
/// ## Errors
/// Returns a parse error only for structurally unreadable input. Malformed
/// individual events are dropped, not errors.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn decode(input: &str) -> RfcResult<Vec<Event>> {
    let root = parse::parse(input)?;
    let resolver = TzResolver::from_document(&root);

    let mut events = Vec::new();
    for component in root.events() {
        if let Some(event) = decode_event(component, &resolver) {
            events.push(event);
        } else {
            tracing::debug!("dropping VEVENT without summary, start, or end");
        }
    }

    tracing::debug!(count = events.len(), "decoded events");
    Ok(events)
}

fn decode_event(component: &Component, tz: &TzResolver) -> Option<Event> {
    let mut title: Option<String> = None;
    let mut description = String::new();
    let mut location = String::new();
    let mut categories = String::new();
    let mut url = String::new();
    let mut color = String::new();
    let mut geo: Option<GeoPoint> = None;
    let mut start: Option<DateTime<Utc>> = None;
    let mut end: Option<DateTime<Utc>> = None;
    let mut all_day = false;
    let mut duration: Option<String> = None;
    let mut rule: Option<Recurrence> = None;
    let mut ex_dates: Vec<DateTime<Utc>> = Vec::new();
    let mut r_dates: Vec<DateTime<Utc>> = Vec::new();
    let mut original_start: Option<DateTime<Utc>> = None;
    let mut uid: Option<String> = None;
    let mut created_at: Option<DateTime<Utc>> = None;
    let mut updated_at: Option<DateTime<Utc>> = None;

    for line in &component.lines {
        match EventProp::parse(&line.name) {
            EventProp::Summary => title = Some(values::unescape_text(&line.raw_value)),
            EventProp::Description => description = values::unescape_text(&line.raw_value),
            EventProp::Location => location = values::unescape_text(&line.raw_value),
            EventProp::Categories => categories = values::unescape_text(&line.raw_value),
            EventProp::Url => url = line.raw_value.clone(),
            EventProp::Color => color = line.raw_value.clone(),
            EventProp::Geo => geo = parse_geo(&line.raw_value),
            EventProp::DtStart => {
                if line.is_date_valued() {
                    all_day = true;
                }
                start = parse_event_time(line, tz);
            }
            EventProp::DtEnd => end = parse_event_time(line, tz),
            EventProp::Duration => duration = Some(line.raw_value.clone()),
            EventProp::RRule => rule = parse_rrule(&line.raw_value, tz),
            EventProp::ExDate => collect_dates(line, tz, &mut ex_dates),
            EventProp::RDate => collect_dates(line, tz, &mut r_dates),
            EventProp::RecurrenceId => original_start = parse_event_time(line, tz),
            EventProp::Uid => uid = Some(line.raw_value.clone()),
            EventProp::Created => created_at = values::parse_utc_datetime(&line.raw_value).ok(),
            EventProp::LastModified => {
                updated_at = values::parse_utc_datetime(&line.raw_value).ok();
            }
            EventProp::Other => {}
        }
    }

    let title = title.filter(|t| !t.is_empty())?;
    let start = start?;
    let end = match end {
        Some(end) => end,
        None => {
            let span = parse_duration(duration.as_deref()?).ok()?;
            start + span
        }
    };

    let kind = if let Some(original_start) = original_start {
        EventKind::Override {
            parent: ParentRef::Uid(uid.clone().unwrap_or_default()),
            original_start,
        }
    } else if let Some(mut rule) = rule {
        rule.ex_dates = ex_dates;
        rule.r_dates = r_dates;
        EventKind::Series(rule)
    } else {
        EventKind::Single
    };

    let mut event = Event::new(title, start, end);
    event.description = description;
    event.location = location;
    event.categories = categories;
    event.url = url;
    event.color = color;
    event.geo = geo;
    event.all_day = all_day;
    event.duration = duration;
    event.reminder_minutes = reminder_minutes(component);
    event.kind = kind;
    event.created_at = created_at;
    event.updated_at = updated_at;
    event.import_uid = uid;
    Some(event)
}

/// Parses a date-time property value. `VALUE=DATE` forces a bare date;
/// otherwise the UTC form, the local-with-TZID form, and the bare-date
/// form are tried in that order.
fn parse_event_time(line: &ContentLine, tz: &TzResolver) -> Option<DateTime<Utc>> {
    if line.is_date_valued() {
        return values::parse_date(&line.raw_value).ok().map(midnight);
    }
    parse_time_value(&line.raw_value, line.tzid(), tz)
}

fn parse_time_value(raw: &str, tzid: Option<&str>, tz: &TzResolver) -> Option<DateTime<Utc>> {
    if let Ok(dt) = values::parse_utc_datetime(raw) {
        return Some(dt);
    }
    if let Ok(naive) = values::parse_naive_datetime(raw) {
        return Some(tz.to_utc(naive, tzid));
    }
    values::parse_date(raw).ok().map(midnight)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Maps an RRULE value onto the recurrence fields. Unrecognized keys are
/// ignored; a rule without FREQ yields no recurrence at all.
fn parse_rrule(raw: &str, tz: &TzResolver) -> Option<Recurrence> {
    let mut freq: Option<Frequency> = None;
    let mut interval = 1u32;
    let mut limit: Option<RecurrenceLimit> = None;
    let mut by_day: Vec<WeekdayNum> = Vec::new();
    let mut by_month_day: Vec<i8> = Vec::new();
    let mut by_month: Vec<u8> = Vec::new();

    for part in raw.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.to_ascii_uppercase().as_str() {
            "FREQ" => freq = Frequency::parse(value),
            "INTERVAL" => {
                if let Ok(n) = value.trim().parse::<u32>() {
                    interval = n.max(1);
                }
            }
            "COUNT" => {
                if let Ok(count) = value.trim().parse::<u32>() {
                    limit = Some(RecurrenceLimit::Count(count));
                }
            }
            "UNTIL" => {
                if let Some(until) = parse_time_value(value, None, tz) {
                    limit = Some(RecurrenceLimit::Until(until));
                }
            }
            "BYDAY" => by_day = value.split(',').filter_map(WeekdayNum::parse).collect(),
            "BYMONTHDAY" => {
                by_month_day = value.split(',').filter_map(|v| v.trim().parse().ok()).collect();
            }
            "BYMONTH" => {
                by_month = value.split(',').filter_map(|v| v.trim().parse().ok()).collect();
            }
            _ => {} // unknown rule parts are ignored
        }
    }

    let mut rule = Recurrence::new(freq?);
    rule.interval = interval;
    rule.limit = limit;
    rule.by_day = by_day;
    rule.by_month_day = by_month_day;
    rule.by_month = by_month;
    Some(rule)
}

/// Accumulates EXDATE/RDATE instants. Multiple properties and
/// comma-separated values both contribute.
fn collect_dates(line: &ContentLine, tz: &TzResolver, out: &mut Vec<DateTime<Utc>>) {
    for chunk in line.raw_value.split(',') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        if let Some(instant) = parse_time_value(chunk, line.tzid(), tz) {
            out.push(instant);
        }
    }
}

fn parse_geo(raw: &str) -> Option<GeoPoint> {
    let (lat, lon) = raw.split_once(';')?;
    Some(GeoPoint {
        latitude: lat.trim().parse().ok()?,
        longitude: lon.trim().parse().ok()?,
    })
}

/// Reminder minutes from the first VALARM's TRIGGER.
fn reminder_minutes(component: &Component) -> u32 {
    component
        .alarms()
        .next()
        .and_then(|alarm| alarm.get_line("TRIGGER"))
        .map_or(0, |trigger| trigger_minutes(&trigger.raw_value))
}

/// Converts a negative ISO 8601 trigger duration into whole minutes
/// before start. Non-negative or zero triggers mean no reminder.
fn trigger_minutes(raw: &str) -> u32 {
    let Some(negated) = raw.trim().strip_prefix('-') else {
        return 0;
    };
    let Ok(span) = parse_duration(negated) else {
        return 0;
    };
    u32::try_from(span.num_minutes()).unwrap_or(0)
}
