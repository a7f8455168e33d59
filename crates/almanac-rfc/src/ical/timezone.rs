//! Timezone resolution for iCalendar date-times.
//!
//! A resolver is built once per decode job from the document's VTIMEZONE
//! blocks and is read-only afterwards. Resolution strategy per TZID:
//!
//! 1. the TZID itself as an IANA zone name;
//! 2. for path-structured TZIDs (`/vendor.example.com/x/Europe/Stockholm`),
//!    progressively shorter `/`-joined suffixes;
//! 3. the first TZOFFSETTO found in a STANDARD sub-block, as a fixed
//!    offset with no DST.
//!
//! A TZID that resolves to nothing is left unresolved: local times using
//! it are copied verbatim into UTC. That is deliberately lossy rather than
//! an error; the original feed survives, minus the offset.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::ical::core::{Component, ComponentKind};
use crate::ical::parse::values::parse_utc_offset;

/// A timezone a TZID resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedTz {
    /// A named IANA zone with full DST rules.
    Iana(Tz),
    /// A fixed UTC offset taken from a VTIMEZONE block.
    Fixed(FixedOffset),
}

/// Maps TZID tokens to resolvable zones for one decode job.
#[derive(Debug, Default)]
pub struct TzResolver {
    zones: HashMap<String, ResolvedTz>,
}

impl TzResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            zones: HashMap::new(),
        }
    }

    /// Builds a resolver from all VTIMEZONE blocks in a document.
    #[must_use]
    pub fn from_document(root: &Component) -> Self {
        let mut resolver = Self::new();
        for tz in root.timezones() {
            resolver.register(tz);
        }
        resolver
    }

    /// Registers one VTIMEZONE block.
    fn register(&mut self, component: &Component) {
        let Some(tzid) = component.get_line("TZID").map(|l| l.raw_value.clone()) else {
            return;
        };
        if tzid.is_empty() {
            return;
        }

        let resolved = resolve_iana(&tzid)
            .map(ResolvedTz::Iana)
            .or_else(|| standard_offset(component).map(ResolvedTz::Fixed));
        match resolved {
            Some(zone) => {
                self.zones.insert(tzid, zone);
            }
            None => tracing::warn!(tzid, "VTIMEZONE with unresolvable TZID"),
        }
    }

    /// Resolves a TZID. TZIDs never declared in a VTIMEZONE still get the
    /// IANA strategies; only the TZOFFSETTO fallback needs a block.
    #[must_use]
    pub fn lookup(&self, tzid: &str) -> Option<ResolvedTz> {
        self.zones
            .get(tzid)
            .copied()
            .or_else(|| resolve_iana(tzid).map(ResolvedTz::Iana))
    }

    /// Converts a local datetime to UTC through the given TZID.
    ///
    /// Without a TZID, or with one that resolves to nothing, the local
    /// time is interpreted as UTC verbatim (lossy fallback).
    #[must_use]
    pub fn to_utc(&self, local: NaiveDateTime, tzid: Option<&str>) -> DateTime<Utc> {
        let Some(tzid) = tzid else {
            return local.and_utc();
        };
        match self.lookup(tzid) {
            Some(ResolvedTz::Iana(tz)) => local_to_utc(&tz, local),
            Some(ResolvedTz::Fixed(offset)) => local_to_utc(&offset, local),
            None => {
                tracing::warn!(tzid, "unresolved TZID, interpreting local time as UTC");
                local.and_utc()
            }
        }
    }
}

/// Local-to-UTC conversion with DST handling: folds take the earlier
/// instant, gap times are shifted forward one hour and retried.
fn local_to_utc<Z: TimeZone>(zone: &Z, local: NaiveDateTime) -> DateTime<Utc> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(first, _) => first.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = local + Duration::hours(1);
            match zone.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
                LocalResult::None => local.and_utc(),
            }
        }
    }
}

/// IANA strategies: the full TZID, then progressively shorter path
/// suffixes of it.
fn resolve_iana(tzid: &str) -> Option<Tz> {
    if let Ok(tz) = Tz::from_str(tzid) {
        return Some(tz);
    }
    if !tzid.contains('/') {
        return None;
    }
    let parts: Vec<&str> = tzid.split('/').filter(|p| !p.is_empty()).collect();
    for i in 1..parts.len() {
        if let Ok(tz) = Tz::from_str(&parts[i..].join("/")) {
            return Some(tz);
        }
    }
    None
}

/// The first TZOFFSETTO inside a STANDARD sub-block, if any parses.
fn standard_offset(component: &Component) -> Option<FixedOffset> {
    component
        .children_of_kind(ComponentKind::Standard)
        .find_map(|standard| {
            let line = standard.get_line("TZOFFSETTO")?;
            parse_utc_offset(&line.raw_value).ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ical::core::ContentLine;
    use chrono::NaiveDate;

    fn local(y: i32, mo: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn vtimezone(tzid: &str, standard_offset_to: Option<&str>) -> Component {
        let mut tz = Component::new("VTIMEZONE");
        tz.lines.push(ContentLine::new("TZID", tzid));
        if let Some(offset) = standard_offset_to {
            let mut standard = Component::new("STANDARD");
            standard.lines.push(ContentLine::new("TZOFFSETTO", offset));
            tz.children.push(standard);
        }
        tz
    }

    #[test]
    fn resolves_direct_iana_name_without_vtimezone() {
        let resolver = TzResolver::new();
        // Stockholm is CET (UTC+1) in March.
        assert_eq!(
            resolver.to_utc(local(2025, 3, 15, 10), Some("Europe/Stockholm")),
            utc(2025, 3, 15, 9, 0)
        );
    }

    #[test]
    fn resolves_dst_offset_in_summer() {
        let resolver = TzResolver::new();
        // June is CEST (UTC+2).
        assert_eq!(
            resolver.to_utc(local(2025, 6, 15, 10), Some("Europe/Stockholm")),
            utc(2025, 6, 15, 8, 0)
        );
    }

    #[test]
    fn resolves_path_structured_tzid_to_iana_suffix() {
        let mut root = Component::new("VCALENDAR");
        root.children
            .push(vtimezone("/citadel.org/20250101_1/Europe/Stockholm", None));
        let resolver = TzResolver::from_document(&root);

        assert_eq!(
            resolver.to_utc(
                local(2025, 6, 15, 10),
                Some("/citadel.org/20250101_1/Europe/Stockholm")
            ),
            utc(2025, 6, 15, 8, 0)
        );
    }

    #[test]
    fn falls_back_to_standard_tzoffsetto() {
        let mut root = Component::new("VCALENDAR");
        root.children.push(vtimezone("CustomTZ-XYZ", Some("+0530")));
        let resolver = TzResolver::from_document(&root);

        assert_eq!(
            resolver.lookup("CustomTZ-XYZ"),
            Some(ResolvedTz::Fixed(FixedOffset::east_opt(19800).unwrap()))
        );
        assert_eq!(
            resolver.to_utc(local(2025, 1, 15, 14), Some("CustomTZ-XYZ")),
            utc(2025, 1, 15, 8, 30)
        );
    }

    #[test]
    fn unresolved_tzid_is_lossy_utc_copy() {
        let resolver = TzResolver::new();
        assert_eq!(
            resolver.to_utc(local(2025, 1, 15, 9), Some("Unknown/Nowhere")),
            utc(2025, 1, 15, 9, 0)
        );
    }

    #[test]
    fn missing_tzid_is_utc_verbatim() {
        let resolver = TzResolver::new();
        assert_eq!(
            resolver.to_utc(local(2025, 1, 15, 9), None),
            utc(2025, 1, 15, 9, 0)
        );
    }

    #[test]
    fn dst_gap_shifts_forward() {
        let resolver = TzResolver::new();
        // 02:30 on 2025-03-30 does not exist in Stockholm (clocks jump
        // 02:00 -> 03:00); conversion retries one hour later.
        let converted = resolver.to_utc(local(2025, 3, 30, 2) + Duration::minutes(30),
            Some("Europe/Stockholm"));
        assert_eq!(converted, utc(2025, 3, 30, 1, 30));
    }

    #[test]
    fn iana_name_wins_over_offset_fallback() {
        // A VTIMEZONE for a real IANA zone must keep full DST rules even
        // when it also carries a STANDARD offset.
        let mut root = Component::new("VCALENDAR");
        root.children
            .push(vtimezone("America/New_York", Some("-0500")));
        let resolver = TzResolver::from_document(&root);

        // July is EDT (UTC-4), which the fixed -0500 fallback would miss.
        assert_eq!(
            resolver.to_utc(local(2025, 7, 15, 9), Some("America/New_York")),
            utc(2025, 7, 15, 13, 0)
        );
    }
}
