//! Document serialization: [`Event`] records to an RFC 5545 feed.

use chrono::{DateTime, Utc};

use almanac_core::model::{Event, EventKind, ParentRef, Recurrence, RecurrenceLimit};

use super::escape::escape_text;

const PRODID: &str = "-//almanac//almanac//EN";
const CALENDAR_NAME: &str = "almanac";
const UID_DOMAIN: &str = "almanac";

/// Encodes events as an iCalendar document, CRLF line endings, suitable
/// for serving as `text/calendar`.
///
/// Serialization never fails on a single event; a partial feed beats no
/// feed. Overrides share their parent's UID and emit RECURRENCE-ID before
/// DTSTART.
#[must_use]
pub fn encode(events: &[Event]) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, &format!("PRODID:{PRODID}"));
    push_line(&mut out, "CALSCALE:GREGORIAN");
    push_line(&mut out, "METHOD:PUBLISH");
    push_line(&mut out, &format!("X-WR-CALNAME:{CALENDAR_NAME}"));

    for event in events {
        encode_event(&mut out, event);
    }

    push_line(&mut out, "END:VCALENDAR");
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str("\r\n");
}

fn encode_event(out: &mut String, event: &Event) {
    push_line(out, "BEGIN:VEVENT");
    push_line(out, &format!("UID:{}", event_uid(event)));

    if let EventKind::Override { original_start, .. } = &event.kind {
        push_line(out, &format!("RECURRENCE-ID:{}", format_utc(*original_start)));
    }

    let has_duration = event.duration.as_deref().is_some_and(|d| !d.is_empty());
    if event.all_day {
        push_line(out, &format!("DTSTART;VALUE=DATE:{}", format_date(event.start)));
        if !has_duration {
            push_line(out, &format!("DTEND;VALUE=DATE:{}", format_date(event.end)));
        }
    } else {
        push_line(out, &format!("DTSTART:{}", format_utc(event.start)));
        if !has_duration {
            push_line(out, &format!("DTEND:{}", format_utc(event.end)));
        }
    }
    if has_duration {
        if let Some(duration) = event.duration.as_deref() {
            push_line(out, &format!("DURATION:{duration}"));
        }
    }

    push_line(out, &format!("SUMMARY:{}", escape_text(&event.title)));
    if !event.description.is_empty() {
        push_line(out, &format!("DESCRIPTION:{}", escape_text(&event.description)));
    }
    if !event.location.is_empty() {
        push_line(out, &format!("LOCATION:{}", escape_text(&event.location)));
    }
    if !event.categories.is_empty() {
        push_line(out, &format!("CATEGORIES:{}", escape_text(&event.categories)));
    }
    if let Some(geo) = event.geo {
        push_line(out, &format!("GEO:{};{}", geo.latitude, geo.longitude));
    }
    if !event.url.is_empty() {
        push_line(out, &format!("URL:{}", event.url));
    }
    if !event.color.is_empty() {
        push_line(out, &format!("COLOR:{}", event.color));
    }

    if let EventKind::Series(rule) = &event.kind {
        push_line(out, &format!("RRULE:{}", format_rrule(rule)));
        for instant in &rule.ex_dates {
            push_line(out, &format!("EXDATE:{}", format_utc(*instant)));
        }
        for instant in &rule.r_dates {
            push_line(out, &format!("RDATE:{}", format_utc(*instant)));
        }
    }

    if event.reminder_minutes > 0 {
        push_line(out, "BEGIN:VALARM");
        push_line(out, "ACTION:DISPLAY");
        push_line(out, &format!("TRIGGER:-PT{}M", event.reminder_minutes));
        push_line(out, &format!("DESCRIPTION:Reminder: {}", escape_text(&event.title)));
        push_line(out, "END:VALARM");
    }

    if let Some(created) = event.created_at {
        push_line(out, &format!("CREATED:{}", format_utc(created)));
    }
    if let Some(updated) = event.updated_at {
        push_line(out, &format!("LAST-MODIFIED:{}", format_utc(updated)));
        push_line(out, &format!("DTSTAMP:{}", format_utc(updated)));
    }

    push_line(out, "END:VEVENT");
}

/// Overrides share their parent's UID per RFC 5545; parents derive theirs
/// from the stored id.
fn event_uid(event: &Event) -> String {
    match &event.kind {
        EventKind::Override {
            parent: ParentRef::Stored(parent_id),
            ..
        } => format!("event-{parent_id}@{UID_DOMAIN}"),
        EventKind::Override {
            parent: ParentRef::Uid(uid),
            ..
        } if !uid.is_empty() => uid.clone(),
        _ => format!("event-{}@{UID_DOMAIN}", event.id.unwrap_or(0)),
    }
}

/// Rebuilds an RRULE value in the fixed order FREQ, INTERVAL, COUNT,
/// UNTIL, BYDAY, BYMONTHDAY, BYMONTH.
fn format_rrule(rule: &Recurrence) -> String {
    let mut parts = vec![format!("FREQ={}", rule.freq)];
    if rule.interval > 1 {
        parts.push(format!("INTERVAL={}", rule.interval));
    }
    match rule.limit {
        Some(RecurrenceLimit::Count(count)) => parts.push(format!("COUNT={count}")),
        Some(RecurrenceLimit::Until(until)) => parts.push(format!("UNTIL={}", format_utc(until))),
        None => {}
    }
    if !rule.by_day.is_empty() {
        parts.push(format!("BYDAY={}", join(rule.by_day.iter())));
    }
    if !rule.by_month_day.is_empty() {
        parts.push(format!("BYMONTHDAY={}", join(rule.by_month_day.iter())));
    }
    if !rule.by_month.is_empty() {
        parts.push(format!("BYMONTH={}", join(rule.by_month.iter())));
    }
    parts.join(";")
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

fn format_utc(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

fn format_date(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%d").to_string()
}
