//! Document segmentation (RFC 5545 §3.4).
//!
//! Splits an iCalendar document into a tree of components, each holding
//! its raw content lines. This is the first of the decoder's two phases;
//! block interpretation happens independently afterwards, so nested
//! BEGIN/END tracking lives only here.

use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::lexer::{parse_content_line, split_lines};
use crate::ical::core::{Component, ComponentKind, ContentLine};

/// Parses an iCalendar document into its component tree.
///
/// The returned root is always a VCALENDAR.
///
/// ## Errors
/// Returns an error if the document has no VCALENDAR wrapper, a component
/// is left unterminated, or BEGIN/END names do not match.
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
pub fn parse(input: &str) -> ParseResult<Component> {
    let lines = split_lines(input);
    if lines.is_empty() {
        tracing::warn!("empty iCalendar input");
        return Err(ParseError::new(ParseErrorKind::MissingBegin, 1, 1));
    }
    tracing::trace!(count = lines.len(), "split content lines");

    let content_lines: Vec<(usize, ContentLine)> = lines
        .into_iter()
        .map(|(line_num, line)| parse_content_line(&line, line_num).map(|cl| (line_num, cl)))
        .collect::<ParseResult<_>>()?;

    let mut iter = content_lines.into_iter();

    let Some((line_num, begin)) = iter.next() else {
        return Err(ParseError::new(ParseErrorKind::MissingBegin, 1, 1));
    };
    if begin.name != "BEGIN" {
        return Err(ParseError::new(ParseErrorKind::MissingBegin, line_num, 1));
    }

    let root = parse_component(&mut iter, &begin.raw_value.to_ascii_uppercase(), line_num)?;
    if root.kind != ComponentKind::Calendar {
        return Err(ParseError::new(ParseErrorKind::MissingBegin, line_num, 1)
            .with_context("expected VCALENDAR"));
    }

    tracing::debug!(
        events = root.events().count(),
        timezones = root.timezones().count(),
        "segmented iCalendar document"
    );
    Ok(root)
}

/// Parses a component body after its BEGIN line has been consumed.
fn parse_component(
    iter: &mut impl Iterator<Item = (usize, ContentLine)>,
    name: &str,
    begin_line_num: usize,
) -> ParseResult<Component> {
    let mut component = Component::new(name);
    let mut last_line_num = begin_line_num;

    loop {
        let Some((line_num, content_line)) = iter.next() else {
            return Err(ParseError::new(ParseErrorKind::MissingEnd, last_line_num, 1)
                .with_context(format!("missing END:{name}")));
        };
        last_line_num = line_num;

        match content_line.name.as_str() {
            "BEGIN" => {
                let nested_name = content_line.raw_value.to_ascii_uppercase();
                let nested = parse_component(iter, &nested_name, line_num)?;
                component.children.push(nested);
            }
            "END" => {
                let end_name = content_line.raw_value.to_ascii_uppercase();
                if end_name != component.name {
                    return Err(
                        ParseError::new(ParseErrorKind::MismatchedComponent, line_num, 1)
                            .with_context(format!(
                                "expected END:{}, got END:{end_name}",
                                component.name
                            )),
                    );
                }
                return Ok(component);
            }
            _ => component.lines.push(content_line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "\
BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20260123T140000Z\r\n\
DTEND:20260123T150000Z\r\n\
SUMMARY:Test Event\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn parse_simple_document() {
        let root = parse(SIMPLE).unwrap();
        assert_eq!(root.kind, ComponentKind::Calendar);
        assert_eq!(
            root.get_line("VERSION").map(|l| l.raw_value.as_str()),
            Some("2.0")
        );

        let events: Vec<_> = root.events().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].get_line("SUMMARY").map(|l| l.raw_value.as_str()),
            Some("Test Event")
        );
    }

    #[test]
    fn parse_nested_alarm() {
        let input = "\
BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:With Alarm\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let root = parse(input).unwrap();
        let event = root.events().next().unwrap();
        let alarms: Vec<_> = event.alarms().collect();
        assert_eq!(alarms.len(), 1);
        assert_eq!(
            alarms[0].get_line("TRIGGER").map(|l| l.raw_value.as_str()),
            Some("-PT15M")
        );
    }

    #[test]
    fn parse_timezone_subcomponents() {
        let input = "\
BEGIN:VCALENDAR\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Custom\r\n\
BEGIN:STANDARD\r\n\
TZOFFSETTO:+0100\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
TZOFFSETTO:+0200\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n\
END:VCALENDAR\r\n";

        let root = parse(input).unwrap();
        let tz = root.timezones().next().unwrap();
        assert_eq!(tz.children_of_kind(ComponentKind::Standard).count(), 1);
        assert_eq!(tz.children_of_kind(ComponentKind::Daylight).count(), 1);
    }

    #[test]
    fn parse_missing_begin() {
        assert!(parse("VERSION:2.0\r\n").is_err());
    }

    #[test]
    fn parse_unterminated_component() {
        let input = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:x\r\nEND:VEVENT\r\n";
        let err = parse(input).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingEnd);
    }

    #[test]
    fn parse_mismatched_end() {
        let input = "BEGIN:VCALENDAR\r\nEND:VEVENT\r\n";
        let err = parse(input).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MismatchedComponent);
    }

    #[test]
    fn parse_unknown_components_are_kept() {
        let input = "\
BEGIN:VCALENDAR\r\n\
BEGIN:VJOURNAL\r\n\
SUMMARY:Journal entry\r\n\
END:VJOURNAL\r\n\
END:VCALENDAR\r\n";

        let root = parse(input).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].kind, ComponentKind::Unknown);
        assert_eq!(root.children[0].name, "VJOURNAL");
    }
}
