//! Encode/decode round-trip tests.
//!
//! For any event with UTC start/end, `decode(encode([event]))` must
//! reproduce the title, instants, and every populated optional field.

use almanac_core::model::{
    Event, EventKind, Frequency, GeoPoint, ParentRef, Recurrence, RecurrenceLimit, WeekdayNum,
};
use chrono::{DateTime, TimeZone, Utc};

use super::fixtures::*;
use crate::ical::{decode, encode};

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn round_trip_one(event: &Event) -> Event {
    let encoded = encode(std::slice::from_ref(event));
    let mut decoded = decode(&encoded).unwrap_or_else(|e| panic!("re-decode failed: {e}\n{encoded}"));
    assert_eq!(decoded.len(), 1, "expected exactly one event back");
    decoded.remove(0)
}

#[test_log::test]
fn round_trip_plain_event() {
    let mut event = Event::new("Team Meeting", utc(2026, 2, 17, 14, 0), utc(2026, 2, 17, 15, 0));
    event.id = Some(1);
    event.description = "Weekly sync".into();
    event.location = "Room 12".into();
    event.categories = "work".into();
    event.url = "https://example.com/meet".into();
    event.color = "#4285f4".into();
    event.reminder_minutes = 30;
    event.created_at = Some(utc(2026, 2, 1, 8, 0));
    event.updated_at = Some(utc(2026, 2, 2, 9, 0));

    let back = round_trip_one(&event);
    assert_eq!(back.title, event.title);
    assert_eq!(back.description, event.description);
    assert_eq!(back.start, event.start);
    assert_eq!(back.end, event.end);
    assert_eq!(back.location, event.location);
    assert_eq!(back.categories, event.categories);
    assert_eq!(back.url, event.url);
    assert_eq!(back.color, event.color);
    assert_eq!(back.reminder_minutes, event.reminder_minutes);
    assert_eq!(back.created_at, event.created_at);
    assert_eq!(back.updated_at, event.updated_at);
}

#[test]
fn round_trip_escaped_text() {
    let mut event = Event::new(
        "Lunch, with; friends\\and\nnewlines",
        utc(2026, 2, 18, 12, 0),
        utc(2026, 2, 18, 13, 0),
    );
    event.description = "First line\nSecond, line".into();

    let back = round_trip_one(&event);
    assert_eq!(back.title, event.title);
    assert_eq!(back.description, event.description);
}

#[test]
fn round_trip_geo_within_float_tolerance() {
    let mut event = Event::new("Located", utc(2026, 2, 18, 12, 0), utc(2026, 2, 18, 13, 0));
    event.geo = Some(GeoPoint {
        latitude: 59.3293,
        longitude: 18.0686,
    });

    let back = round_trip_one(&event);
    let geo = back.geo.unwrap();
    assert!((geo.latitude - 59.3293).abs() < 1e-6);
    assert!((geo.longitude - 18.0686).abs() < 1e-6);
}

#[test]
fn round_trip_all_day_event() {
    let mut event = Event::new("Holiday", utc(2026, 3, 15, 0, 0), utc(2026, 3, 16, 0, 0));
    event.all_day = true;

    let back = round_trip_one(&event);
    assert!(back.all_day);
    assert_eq!(back.start, event.start);
    assert_eq!(back.end, event.end);
}

#[test_log::test]
fn round_trip_recurring_event() {
    let mut event = Event::new("Standup", utc(2026, 2, 2, 9, 0), utc(2026, 2, 2, 9, 15));
    event.id = Some(3);
    let mut rule = Recurrence::new(Frequency::Weekly);
    rule.interval = 2;
    rule.limit = Some(RecurrenceLimit::Count(10));
    rule.by_day = vec![WeekdayNum::parse("MO").unwrap(), WeekdayNum::parse("FR").unwrap()];
    rule.ex_dates = vec![utc(2026, 2, 16, 9, 0)];
    rule.r_dates = vec![utc(2026, 2, 5, 9, 0)];
    event.kind = EventKind::Series(rule.clone());

    let back = round_trip_one(&event);
    let EventKind::Series(back_rule) = &back.kind else {
        panic!("expected a series back");
    };
    assert_eq!(*back_rule, rule);
}

#[test]
fn round_trip_until_limit() {
    let mut event = Event::new("Bounded", utc(2026, 2, 2, 9, 0), utc(2026, 2, 2, 10, 0));
    let mut rule = Recurrence::new(Frequency::Daily);
    rule.limit = Some(RecurrenceLimit::Until(utc(2026, 3, 1, 9, 0)));
    event.kind = EventKind::Series(rule.clone());

    let back = round_trip_one(&event);
    assert_eq!(back.recurrence(), Some(&rule));
}

#[test]
fn round_trip_duration_event() {
    let mut event = Event::new("Spanned", utc(2026, 2, 2, 9, 0), utc(2026, 2, 2, 10, 30));
    event.duration = Some("PT1H30M".into());

    let back = round_trip_one(&event);
    assert_eq!(back.duration.as_deref(), Some("PT1H30M"));
    // The end is recomputed from DTSTART + DURATION.
    assert_eq!(back.end, event.end);
}

#[test]
fn round_trip_override_keeps_original_start() {
    let mut event = Event::new("Moved", utc(2026, 3, 9, 14, 0), utc(2026, 3, 9, 15, 0));
    event.id = Some(42);
    event.kind = EventKind::Override {
        parent: ParentRef::Stored(7),
        original_start: utc(2026, 3, 9, 9, 0),
    };

    let back = round_trip_one(&event);
    let EventKind::Override {
        parent,
        original_start,
    } = &back.kind
    else {
        panic!("expected an override back");
    };
    assert_eq!(*original_start, utc(2026, 3, 9, 9, 0));
    // The stored parent id round-trips as the shared UID.
    assert_eq!(*parent, ParentRef::Uid("event-7@almanac".into()));
    assert_eq!(back.start, event.start);
}

#[test]
fn round_trip_fixture_documents() {
    for (name, fixture) in [
        ("minimal", VEVENT_MINIMAL),
        ("two-events", VEVENT_TWO_EVENTS),
        ("recurring", VEVENT_RECURRING),
        ("all-day", VEVENT_ALL_DAY),
        ("alarm", VEVENT_WITH_ALARM),
        ("override", VEVENT_WITH_OVERRIDE),
        ("extras", VEVENT_EXTRAS),
    ] {
        let first = decode(fixture).unwrap_or_else(|e| panic!("{name}: first decode failed: {e}"));
        let encoded = encode(&first);
        let second =
            decode(&encoded).unwrap_or_else(|e| panic!("{name}: second decode failed: {e}"));

        assert_eq!(first.len(), second.len(), "{name}: event count changed");
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.title, b.title, "{name}: title changed");
            assert_eq!(a.start, b.start, "{name}: start changed");
            assert_eq!(a.end, b.end, "{name}: end changed");
            assert_eq!(a.all_day, b.all_day, "{name}: all-day flag changed");
            assert_eq!(
                a.reminder_minutes, b.reminder_minutes,
                "{name}: reminder changed"
            );
            assert_eq!(a.recurrence(), b.recurrence(), "{name}: recurrence changed");
        }
    }
}
