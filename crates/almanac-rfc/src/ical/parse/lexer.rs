//! Content line lexer for iCalendar (RFC 5545 §3.1).
//!
//! Handles line unfolding and tokenization of content lines.

use super::error::{ParseError, ParseErrorKind, ParseResult};
use crate::ical::core::{ContentLine, Parameter};

/// Splits input into logical content lines, merging folded continuations.
///
/// Handles both CRLF and bare LF line endings; the trailing `\r` is
/// stripped before the fold check. Per RFC 5545 §3.1 a physical line
/// starting with SP/HTAB continues the previous logical line, and
/// unfolding removes the line break plus that single whitespace character.
/// Returns each logical line with the physical line number it started on.
#[must_use]
pub fn split_lines(input: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();

    for (i, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        if line.starts_with([' ', '\t']) {
            let continuation = &line[1..];
            if let Some((_, prev)) = lines.last_mut() {
                prev.push_str(continuation);
            } else {
                lines.push((i + 1, continuation.to_string()));
            }
        } else if !line.contains(':') {
            // Lenient: treat lines without a colon as folded continuations.
            if let Some((_, prev)) = lines.last_mut() {
                prev.push_str(line);
            } else {
                lines.push((i + 1, line.to_string()));
            }
        } else {
            lines.push((i + 1, line.to_string()));
        }
    }

    lines
}

/// What terminated a parameter: another parameter follows, or the value.
enum ParamEnd {
    Semicolon,
    /// Byte position of the colon.
    Colon(usize),
}

/// Parses a single content line of the form `name *(";" param) ":" value`.
///
/// ## Errors
/// Returns an error if the line is malformed or contains invalid
/// characters in the name or parameter section.
pub fn parse_content_line(line: &str, line_num: usize) -> ParseResult<ContentLine> {
    let mut chars = line.char_indices().peekable();

    // Property name runs until ';' or ':'.
    let mut separator = None;
    while let Some(&(i, c)) = chars.peek() {
        match c {
            ';' | ':' => {
                separator = Some((i, c));
                break;
            }
            _ if c.is_ascii_alphanumeric() || c == '-' => {
                chars.next();
            }
            _ => {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidPropertyName,
                    line_num,
                    i + 1,
                ));
            }
        }
    }

    let Some((name_end, sep)) = separator else {
        return Err(ParseError::new(
            ParseErrorKind::MissingColon,
            line_num,
            line.len(),
        ));
    };
    if name_end == 0 {
        return Err(ParseError::new(
            ParseErrorKind::MissingPropertyName,
            line_num,
            1,
        ));
    }

    let name = line[..name_end].to_ascii_uppercase();
    chars.next(); // consume the separator

    let mut params = Vec::new();
    let value_start = if sep == ':' {
        name_end + 1
    } else {
        loop {
            let (param, end) = parse_parameter(&mut chars, line, line_num)?;
            params.push(param);
            match end {
                ParamEnd::Semicolon => {}
                ParamEnd::Colon(pos) => break pos + 1,
            }
        }
    };

    Ok(ContentLine {
        name,
        params,
        raw_value: line[value_start..].to_string(),
    })
}

/// Parses one parameter (`NAME=value[,value...]`) from the stream,
/// consuming the delimiter that follows it.
fn parse_parameter(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    line: &str,
    line_num: usize,
) -> ParseResult<(Parameter, ParamEnd)> {
    let start = chars.peek().map_or(line.len(), |&(i, _)| i);

    // Parameter name runs until '='.
    let mut name_end = start;
    while let Some(&(i, c)) = chars.peek() {
        if c == '=' {
            name_end = i;
            chars.next();
            break;
        }
        if !c.is_ascii_alphanumeric() && c != '-' {
            return Err(ParseError::new(
                ParseErrorKind::InvalidParameter,
                line_num,
                i + 1,
            ));
        }
        chars.next();
    }
    if name_end == start {
        return Err(ParseError::new(
            ParseErrorKind::InvalidParameter,
            line_num,
            start + 1,
        ));
    }

    let param_name = &line[start..name_end];

    // Comma-separated values, each possibly quoted.
    let mut values = Vec::new();
    loop {
        values.push(parse_param_value(chars, line, line_num)?);

        match chars.next() {
            Some((_, ',')) => {}
            Some((_, ';')) => {
                return Ok((
                    Parameter::with_values(param_name, values),
                    ParamEnd::Semicolon,
                ));
            }
            Some((i, ':')) => {
                return Ok((
                    Parameter::with_values(param_name, values),
                    ParamEnd::Colon(i),
                ));
            }
            Some((i, c)) => {
                return Err(
                    ParseError::new(ParseErrorKind::InvalidParameter, line_num, i + 1)
                        .with_context(format!("unexpected character '{c}'")),
                );
            }
            None => {
                return Err(ParseError::new(
                    ParseErrorKind::MissingColon,
                    line_num,
                    line.len(),
                ));
            }
        }
    }
}

/// Parses a parameter value, handling quoting and RFC 6868 caret escapes.
fn parse_param_value(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    line: &str,
    line_num: usize,
) -> ParseResult<String> {
    let Some(&(start, first)) = chars.peek() else {
        return Err(ParseError::new(
            ParseErrorKind::InvalidParameter,
            line_num,
            line.len(),
        ));
    };

    if first != '"' {
        // Unquoted: runs until ',' ';' or ':'.
        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c == ',' || c == ';' || c == ':' {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }
        return Ok(line[start..end].to_string());
    }

    chars.next(); // opening quote
    let mut value = String::new();
    loop {
        match chars.next() {
            Some((_, '"')) => return Ok(value),
            Some((_, '^')) => match chars.peek() {
                Some(&(_, '^')) => {
                    value.push('^');
                    chars.next();
                }
                Some(&(_, 'n')) => {
                    value.push('\n');
                    chars.next();
                }
                Some(&(_, '\'')) => {
                    value.push('"');
                    chars.next();
                }
                _ => value.push('^'),
            },
            Some((_, c)) => value.push(c),
            None => {
                return Err(ParseError::new(
                    ParseErrorKind::UnclosedQuote,
                    line_num,
                    start + 1,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_unfolds_continuations() {
        let input = "SUMMARY:This is a long \r\n summary that spans \r\n multiple lines\r\n";
        let lines = split_lines(input);
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].1,
            "SUMMARY:This is a long summary that spans multiple lines"
        );
    }

    #[test]
    fn split_handles_bare_lf() {
        let input = "DESCRIPTION:First\n Second\nSUMMARY:Next";
        let lines = split_lines(input);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].1, "DESCRIPTION:FirstSecond");
        assert_eq!(lines[1].1, "SUMMARY:Next");
    }

    #[test]
    fn split_handles_tab_continuation() {
        let input = "SUMMARY:One\r\n\tTwo\r\n";
        let lines = split_lines(input);
        assert_eq!(lines[0].1, "SUMMARY:OneTwo");
    }

    #[test]
    fn split_tracks_line_numbers() {
        let input = "LINE1:a\r\nLINE2:b\r\n folded\r\nLINE3:c\r\n";
        let lines = split_lines(input);
        let numbers: Vec<usize> = lines.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 4]);
    }

    #[test]
    fn parse_simple_line() {
        let cl = parse_content_line("SUMMARY:Team Meeting", 1).unwrap();
        assert_eq!(cl.name, "SUMMARY");
        assert!(cl.params.is_empty());
        assert_eq!(cl.raw_value, "Team Meeting");
    }

    #[test]
    fn parse_line_with_params() {
        let cl = parse_content_line("DTSTART;TZID=Europe/Stockholm:20250315T100000", 1).unwrap();
        assert_eq!(cl.name, "DTSTART");
        assert_eq!(cl.params.len(), 1);
        assert_eq!(cl.tzid(), Some("Europe/Stockholm"));
        assert_eq!(cl.raw_value, "20250315T100000");
    }

    #[test]
    fn parse_line_with_multiple_params() {
        let cl = parse_content_line("DTSTART;VALUE=DATE;TZID=UTC:20250315", 1).unwrap();
        assert_eq!(cl.params.len(), 2);
        assert!(cl.is_date_valued());
        assert_eq!(cl.tzid(), Some("UTC"));
    }

    #[test]
    fn parse_line_with_quoted_param() {
        let cl = parse_content_line("ORGANIZER;CN=\"Doe, Jane\":mailto:jane@example.com", 1).unwrap();
        assert_eq!(cl.get_param_value("CN"), Some("Doe, Jane"));
        assert_eq!(cl.raw_value, "mailto:jane@example.com");
    }

    #[test]
    fn parse_line_with_multi_value_param() {
        let cl = parse_content_line("X-PROP;ROLE=A,B:value", 1).unwrap();
        assert_eq!(cl.params[0].values, vec!["A", "B"]);
    }

    #[test]
    fn parse_line_with_caret_escape() {
        let cl = parse_content_line("X-PROP;CN=\"Test^nName\":value", 1).unwrap();
        assert_eq!(cl.get_param_value("CN"), Some("Test\nName"));
    }

    #[test]
    fn parse_value_keeps_colons() {
        let cl = parse_content_line("URL:https://example.com/cal", 1).unwrap();
        assert_eq!(cl.raw_value, "https://example.com/cal");
    }

    #[test]
    fn parse_unclosed_quote_is_an_error() {
        let err = parse_content_line("X-PROP;CN=\"Unclosed:value", 1).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnclosedQuote);
    }

    #[test]
    fn parse_missing_colon_is_an_error() {
        let err = parse_content_line("INVALID", 1).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingColon);
    }

    #[test]
    fn parse_empty_name_is_an_error() {
        let err = parse_content_line(":value", 1).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingPropertyName);
    }
}
