//! Recurrence expansion engine.
//!
//! Candidate generation is calendar-aware: month and year steps use
//! `chrono::Months` so variable-length months are crossed correctly, and
//! BY* selectors resolve against the actual shape of each month. All
//! generators stop at the COUNT/UNTIL limits, at the query window's end,
//! and at a hard ceiling of [`MAX_CANDIDATES`] generated candidates, which
//! bounds work for any rule/window combination.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::error::CoreResult;
use crate::model::{Event, EventKind, Frequency, Recurrence, RecurrenceLimit, Weekday, WeekdayNum};

/// Hard ceiling on generated candidates per expansion call.
pub const MAX_CANDIDATES: usize = 1000;

/// Iteration guard for the daily filter loop, whose selectors may never
/// match (e.g. BYMONTHDAY=30 with BYMONTH=2).
const MAX_FILTER_STEPS: usize = MAX_CANDIDATES * 10;

/// Index assigned to instances that are not part of the base series.
pub const RDATE_INDEX: i64 = -1;

/// One concrete occurrence of a recurring event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    /// Transient copy of the parent event, with `start`/`end` replaced by
    /// the occurrence's concrete instants.
    #[serde(flatten)]
    pub event: Event,
    /// Ordinal position in the base series. [`RDATE_INDEX`] marks
    /// instances added outside the series cadence.
    pub index: i64,
}

/// Generation limits shared by all candidate generators.
struct Bounds {
    until: Option<DateTime<Utc>>,
    to: DateTime<Utc>,
    count: Option<usize>,
}

impl Bounds {
    /// Whether generation must stop at this candidate. UNTIL is inclusive:
    /// a candidate exactly equal to it is still emitted.
    fn cuts(&self, candidate: DateTime<Utc>, generated: usize) -> bool {
        if self.until.is_some_and(|u| candidate > u) {
            return true;
        }
        if candidate >= self.to {
            return true;
        }
        if self.count.is_some_and(|c| generated >= c) {
            return true;
        }
        generated >= MAX_CANDIDATES
    }
}

/// Expands a recurring event over the half-open window `[from, to)`.
///
/// Returns the occurrence instances overlapping the window, sorted by
/// start. Non-recurring events expand to nothing. EXDATE instants are
/// dropped after index assignment, so the surviving indices still name
/// positions in the unfiltered series; RDATE instants are appended with
/// [`RDATE_INDEX`].
///
/// ## Errors
/// Returns `CoreError::ValidationError` if the event or its rule violates
/// the model invariants; nothing is expanded in that case.
pub fn expand(event: &Event, from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<Vec<Instance>> {
    event.validate()?;
    let EventKind::Series(rule) = &event.kind else {
        return Ok(Vec::new());
    };

    let span = event.end - event.start;
    let bounds = Bounds {
        until: match rule.limit {
            Some(RecurrenceLimit::Until(u)) => Some(u),
            _ => None,
        },
        to,
        count: match rule.limit {
            Some(RecurrenceLimit::Count(c)) => Some(c as usize),
            _ => None,
        },
    };

    let candidates = generate_candidates(event.start, rule, &bounds);
    if candidates.len() >= MAX_CANDIDATES {
        tracing::debug!(event_id = ?event.id, "expansion truncated at candidate ceiling");
    }

    let mut instances = Vec::new();
    for (i, start) in candidates.into_iter().enumerate() {
        if rule.ex_dates.contains(&start) {
            continue;
        }
        let end = start + span;
        if end > from && start < to {
            instances.push(make_instance(event, start, end, i as i64));
        }
    }

    for &rdate in &rule.r_dates {
        if rule.ex_dates.contains(&rdate) {
            continue;
        }
        if bounds.until.is_some_and(|u| rdate > u) {
            continue;
        }
        let end = rdate + span;
        if end > from && rdate < to {
            instances.push(make_instance(event, rdate, end, RDATE_INDEX));
        }
    }

    instances.sort_by_key(|inst| (inst.event.start, inst.index));
    Ok(instances)
}

fn make_instance(event: &Event, start: DateTime<Utc>, end: DateTime<Utc>, index: i64) -> Instance {
    let mut copy = event.clone();
    copy.start = start;
    copy.end = end;
    Instance { event: copy, index }
}

fn generate_candidates(
    start: DateTime<Utc>,
    rule: &Recurrence,
    bounds: &Bounds,
) -> Vec<DateTime<Utc>> {
    if rule.has_selectors() {
        if let Some(candidates) = selector_candidates(start, rule, bounds) {
            return candidates;
        }
    }
    simple_candidates(start, rule.freq, rule.interval, bounds)
}

/// Simple stepping: candidate `i` is the series start advanced by
/// `i * interval` frequency units.
fn simple_candidates(
    start: DateTime<Utc>,
    freq: Frequency,
    interval: u32,
    bounds: &Bounds,
) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    for i in 0..MAX_CANDIDATES {
        let Some(candidate) = step(start, freq, (i as u32).saturating_mul(interval)) else {
            break;
        };
        if bounds.cuts(candidate, out.len()) {
            break;
        }
        out.push(candidate);
    }
    out
}

/// Advances `start` by `units` of the frequency, calendar-aware.
fn step(start: DateTime<Utc>, freq: Frequency, units: u32) -> Option<DateTime<Utc>> {
    match freq {
        Frequency::Daily => start.checked_add_days(Days::new(u64::from(units))),
        Frequency::Weekly => start.checked_add_days(Days::new(u64::from(units) * 7)),
        Frequency::Monthly => start.checked_add_months(Months::new(units)),
        Frequency::Yearly => start.checked_add_months(Months::new(units.checked_mul(12)?)),
    }
}

/// Selector-based generation. Returns `None` when the frequency/selector
/// combination has no dedicated generator; the caller then falls back to
/// simple stepping.
fn selector_candidates(
    start: DateTime<Utc>,
    rule: &Recurrence,
    bounds: &Bounds,
) -> Option<Vec<DateTime<Utc>>> {
    match rule.freq {
        Frequency::Weekly if !rule.by_day.is_empty() => {
            Some(weekly_by_day(start, rule.interval, &rule.by_day, bounds))
        }
        Frequency::Monthly if !rule.by_day.is_empty() => {
            Some(monthly_by_day(start, rule.interval, &rule.by_day, bounds))
        }
        Frequency::Monthly if !rule.by_month_day.is_empty() => Some(monthly_by_month_day(
            start,
            rule.interval,
            &rule.by_month_day,
            bounds,
        )),
        Frequency::Yearly if !rule.by_month.is_empty() => Some(yearly_by_month(
            start,
            rule.interval,
            &rule.by_month,
            &rule.by_month_day,
            bounds,
        )),
        Frequency::Yearly if !rule.by_day.is_empty() => {
            Some(yearly_by_day(start, rule.interval, &rule.by_day, bounds))
        }
        Frequency::Daily => Some(daily_filtered(start, rule, bounds)),
        _ => None,
    }
}

/// Appends a candidate unless it precedes the series start. Returns false
/// when generation must stop entirely.
fn try_push(
    out: &mut Vec<DateTime<Utc>>,
    bounds: &Bounds,
    series_start: DateTime<Utc>,
    candidate: DateTime<Utc>,
) -> bool {
    if candidate < series_start {
        return true;
    }
    if bounds.cuts(candidate, out.len()) {
        return false;
    }
    out.push(candidate);
    true
}

/// WEEKLY + BYDAY: Monday-aligned week windows spaced `interval` weeks
/// apart, one candidate per listed weekday at the original time-of-day.
fn weekly_by_day(
    start: DateTime<Utc>,
    interval: u32,
    by_day: &[WeekdayNum],
    bounds: &Bounds,
) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let time = start.time();
    let start_date = start.date_naive();
    let Some(week_start) =
        start_date.checked_sub_days(Days::new(u64::from(start_date.weekday().num_days_from_monday())))
    else {
        return out;
    };

    for week_idx in 0..=MAX_CANDIDATES {
        let Some(base) =
            week_start.checked_add_days(Days::new(week_idx as u64 * u64::from(interval) * 7))
        else {
            break;
        };
        for entry in by_day {
            let Some(date) =
                base.checked_add_days(Days::new(u64::from(entry.weekday.num_days_from_monday())))
            else {
                continue;
            };
            let candidate = date.and_time(time).and_utc();
            if !try_push(&mut out, bounds, start, candidate) {
                return out;
            }
        }
        if out.len() >= MAX_CANDIDATES {
            break;
        }
    }
    out
}

/// MONTHLY + BYDAY: ordinal entries resolve to the nth weekday of each
/// month; ordinal-less entries emit every occurrence of that weekday.
fn monthly_by_day(
    start: DateTime<Utc>,
    interval: u32,
    by_day: &[WeekdayNum],
    bounds: &Bounds,
) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let time = start.time();
    let Some(base_month) = start.date_naive().with_day(1) else {
        return out;
    };

    for month_idx in 0..=MAX_CANDIDATES {
        let Some(month_start) = base_month.checked_add_months(Months::new(month_idx as u32 * interval))
        else {
            break;
        };
        let (year, month) = (month_start.year(), month_start.month());

        for entry in by_day {
            if let Some(n) = entry.ordinal {
                let Some(date) = nth_weekday_of_month(year, month, entry.weekday, n) else {
                    continue;
                };
                let candidate = date.and_time(time).and_utc();
                if !try_push(&mut out, bounds, start, candidate) {
                    return out;
                }
            } else {
                let offset = (entry.weekday.num_days_from_monday() + 7
                    - month_start.weekday().num_days_from_monday())
                    % 7;
                let mut day = 1 + offset;
                while day <= days_in_month(year, month) {
                    let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                        break;
                    };
                    let candidate = date.and_time(time).and_utc();
                    if !try_push(&mut out, bounds, start, candidate) {
                        return out;
                    }
                    day += 7;
                }
            }
        }
        if out.len() >= MAX_CANDIDATES {
            break;
        }
    }
    out
}

/// MONTHLY + BYMONTHDAY: listed days resolved against each month's actual
/// length; out-of-range days are skipped for that month.
fn monthly_by_month_day(
    start: DateTime<Utc>,
    interval: u32,
    by_month_day: &[i8],
    bounds: &Bounds,
) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let time = start.time();
    let Some(base_month) = start.date_naive().with_day(1) else {
        return out;
    };

    for month_idx in 0..=MAX_CANDIDATES {
        let Some(month_start) = base_month.checked_add_months(Months::new(month_idx as u32 * interval))
        else {
            break;
        };
        let (year, month) = (month_start.year(), month_start.month());
        let max_day = days_in_month(year, month);

        for &dom in by_month_day {
            let Some(day) = resolve_month_day(dom, max_day) else {
                continue;
            };
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            let candidate = date.and_time(time).and_utc();
            if !try_push(&mut out, bounds, start, candidate) {
                return out;
            }
        }
        if out.len() >= MAX_CANDIDATES {
            break;
        }
    }
    out
}

/// YEARLY + BYMONTH: per year and listed month, BYMONTHDAY when present,
/// else the original day-of-month.
fn yearly_by_month(
    start: DateTime<Utc>,
    interval: u32,
    by_month: &[u8],
    by_month_day: &[i8],
    bounds: &Bounds,
) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let time = start.time();
    let original_day = start.day();

    for year_idx in 0..=MAX_CANDIDATES {
        let year = start.year() + year_idx as i32 * interval as i32;

        for &m in by_month {
            if !(1..=12).contains(&m) {
                continue;
            }
            let month = u32::from(m);
            let max_day = days_in_month(year, month);

            let mut days: Vec<u32> = Vec::new();
            if by_month_day.is_empty() {
                if original_day <= max_day {
                    days.push(original_day);
                }
            } else {
                for &dom in by_month_day {
                    if let Some(day) = resolve_month_day(dom, max_day) {
                        days.push(day);
                    }
                }
            }

            for day in days {
                let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                    continue;
                };
                let candidate = date.and_time(time).and_utc();
                if !try_push(&mut out, bounds, start, candidate) {
                    return out;
                }
            }
        }
        if out.len() >= MAX_CANDIDATES {
            break;
        }
    }
    out
}

/// YEARLY + BYDAY: nth-weekday resolution once per year, within the
/// original start month. Ordinal-less entries have no meaning here.
fn yearly_by_day(
    start: DateTime<Utc>,
    interval: u32,
    by_day: &[WeekdayNum],
    bounds: &Bounds,
) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    let time = start.time();
    let month = start.month();

    for year_idx in 0..=MAX_CANDIDATES {
        let year = start.year() + year_idx as i32 * interval as i32;

        for entry in by_day {
            let Some(n) = entry.ordinal else {
                continue;
            };
            let Some(date) = nth_weekday_of_month(year, month, entry.weekday, n) else {
                continue;
            };
            let candidate = date.and_time(time).and_utc();
            if !try_push(&mut out, bounds, start, candidate) {
                return out;
            }
        }
        if out.len() >= MAX_CANDIDATES {
            break;
        }
    }
    out
}

/// DAILY with any BY* selector: step daily, keep candidates whose date
/// components satisfy every configured filter.
fn daily_filtered(start: DateTime<Utc>, rule: &Recurrence, bounds: &Bounds) -> Vec<DateTime<Utc>> {
    let mut out = Vec::new();
    for i in 0..MAX_FILTER_STEPS {
        let Some(candidate) = start.checked_add_days(Days::new(i as u64 * u64::from(rule.interval)))
        else {
            break;
        };
        if bounds.until.is_some_and(|u| candidate > u) {
            break;
        }
        if candidate >= bounds.to {
            break;
        }
        if matches_filters(candidate, rule) {
            if bounds.count.is_some_and(|c| out.len() >= c) || out.len() >= MAX_CANDIDATES {
                break;
            }
            out.push(candidate);
        }
    }
    out
}

/// Conjunctive BY* date-component match. BYDAY ordinals carry no meaning
/// at daily frequency and match on the weekday alone.
fn matches_filters(candidate: DateTime<Utc>, rule: &Recurrence) -> bool {
    if !rule.by_month.is_empty() && !rule.by_month.contains(&(candidate.month() as u8)) {
        return false;
    }
    if !rule.by_month_day.is_empty() {
        let max_day = days_in_month(candidate.year(), candidate.month());
        let hit = rule
            .by_month_day
            .iter()
            .any(|&dom| resolve_month_day(dom, max_day) == Some(candidate.day()));
        if !hit {
            return false;
        }
    }
    if !rule.by_day.is_empty() {
        let weekday = candidate.weekday();
        if !rule.by_day.iter().any(|entry| entry.weekday.matches(weekday)) {
            return false;
        }
    }
    true
}

/// Finds the nth occurrence of a weekday in a month. Positive `n` counts
/// from the start (1 = first), negative from the end (-1 = last). Returns
/// `None` when the occurrence does not exist.
fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, n: i8) -> Option<NaiveDate> {
    if n == 0 {
        return None;
    }
    if n > 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let offset =
            (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
        let day = 1 + offset + (u32::from(n.unsigned_abs()) - 1) * 7;
        NaiveDate::from_ymd_opt(year, month, day)
    } else {
        let max_day = days_in_month(year, month);
        let last = NaiveDate::from_ymd_opt(year, month, max_day)?;
        let offset =
            (last.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
        let day = i64::from(max_day) - i64::from(offset) + (i64::from(n) + 1) * 7;
        u32::try_from(day).ok().and_then(|d| NaiveDate::from_ymd_opt(year, month, d))
    }
}

/// Resolves a signed day-of-month against a month's length. Negative days
/// count from the end (-1 = last day). Out-of-range days resolve to `None`.
fn resolve_month_day(dom: i8, max_day: u32) -> Option<u32> {
    let day = if dom < 0 {
        i64::from(max_day) + i64::from(dom) + 1
    } else {
        i64::from(dom)
    };
    if day < 1 || day > i64::from(max_day) {
        return None;
    }
    u32::try_from(day).ok()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .map_or(30, |d| d.day())
}
