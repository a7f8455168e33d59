//! Per-instance override merging.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::model::{Event, EventKind, ParentRef};

use super::engine::{Instance, RDATE_INDEX};

/// Substitutes stored overrides into expanded instances.
///
/// An override matches an instance when its parent id equals the
/// instance's event id and its original start equals the instance's start.
/// Matched overrides replace the generated instance when their own
/// interval overlaps `[from, to)`; otherwise the occurrence disappears
/// from the result (the override moved it out of the window). Overrides
/// never matched by generation are still included when they overlap the
/// window. The merged list is sorted by start.
#[must_use]
pub fn apply_overrides(
    instances: Vec<Instance>,
    overrides: &[Event],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<Instance> {
    let mut by_key: HashMap<(i64, DateTime<Utc>), &Event> = HashMap::new();
    for event in overrides {
        if let EventKind::Override {
            parent: ParentRef::Stored(parent_id),
            original_start,
        } = &event.kind
        {
            by_key.insert((*parent_id, *original_start), event);
        }
    }
    if by_key.is_empty() {
        return instances;
    }

    let mut result = Vec::with_capacity(instances.len());
    let mut replaced: HashSet<(i64, DateTime<Utc>)> = HashSet::new();

    for instance in instances {
        let Some(id) = instance.event.id else {
            result.push(instance);
            continue;
        };
        let key = (id, instance.event.start);
        if let Some(&event) = by_key.get(&key) {
            replaced.insert(key);
            if event.end > from && event.start < to {
                result.push(Instance {
                    event: event.clone(),
                    index: instance.index,
                });
            }
        } else {
            result.push(instance);
        }
    }

    for (key, &event) in &by_key {
        if replaced.contains(key) {
            continue;
        }
        if event.end > from && event.start < to {
            result.push(Instance {
                event: event.clone(),
                index: RDATE_INDEX,
            });
        }
    }

    result.sort_by_key(|inst| (inst.event.start, inst.index));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;
    use crate::model::{Frequency, Recurrence, RecurrenceLimit};
    use chrono::TimeZone;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn weekly_parent() -> Event {
        let mut event = Event::new("Weekly Meeting", dt(2026, 3, 2, 9, 0), dt(2026, 3, 2, 10, 0));
        event.id = Some(1);
        let mut rule = Recurrence::new(Frequency::Weekly);
        rule.limit = Some(RecurrenceLimit::Count(4));
        event.kind = EventKind::Series(rule);
        event
    }

    fn override_for(parent_id: i64, original_start: DateTime<Utc>, start: DateTime<Utc>) -> Event {
        let mut event = Event::new("Weekly Meeting (moved)", start, start + chrono::Duration::hours(1));
        event.id = Some(42);
        event.kind = EventKind::Override {
            parent: ParentRef::Stored(parent_id),
            original_start,
        };
        event
    }

    #[test]
    fn override_replaces_generated_instance() {
        let parent = weekly_parent();
        let from = dt(2026, 3, 1, 0, 0);
        let to = dt(2026, 3, 31, 0, 0);
        let instances = expand(&parent, from, to).unwrap();
        assert_eq!(instances.len(), 4);

        // Move the Mar 9 occurrence to 14:00 the same day.
        let moved = override_for(1, dt(2026, 3, 9, 9, 0), dt(2026, 3, 9, 14, 0));
        let merged = apply_overrides(instances, std::slice::from_ref(&moved), from, to);

        assert_eq!(merged.len(), 4, "override must replace, not duplicate");
        assert!(merged.iter().all(|i| i.event.start != dt(2026, 3, 9, 9, 0)));
        let replacement = merged
            .iter()
            .find(|i| i.event.start == dt(2026, 3, 9, 14, 0))
            .unwrap();
        assert_eq!(replacement.event.title, "Weekly Meeting (moved)");
    }

    #[test]
    fn override_outside_window_removes_occurrence() {
        let parent = weekly_parent();
        let from = dt(2026, 3, 1, 0, 0);
        let to = dt(2026, 3, 31, 0, 0);
        let instances = expand(&parent, from, to).unwrap();

        // Moved into April, outside the queried window.
        let moved = override_for(1, dt(2026, 3, 9, 9, 0), dt(2026, 4, 2, 9, 0));
        let merged = apply_overrides(instances, std::slice::from_ref(&moved), from, to);

        assert_eq!(merged.len(), 3);
        assert!(merged.iter().all(|i| i.event.start != dt(2026, 3, 9, 9, 0)));
    }

    #[test]
    fn unmatched_override_in_window_is_included() {
        let parent = weekly_parent();
        let from = dt(2026, 3, 1, 0, 0);
        let to = dt(2026, 3, 31, 0, 0);
        let instances = expand(&parent, from, to).unwrap();

        // The original start never appears in the generated series.
        let stray = override_for(1, dt(2026, 6, 1, 9, 0), dt(2026, 3, 20, 9, 0));
        let merged = apply_overrides(instances, std::slice::from_ref(&stray), from, to);

        assert_eq!(merged.len(), 5);
        let included = merged
            .iter()
            .find(|i| i.event.start == dt(2026, 3, 20, 9, 0))
            .unwrap();
        assert_eq!(included.index, RDATE_INDEX);
    }

    #[test]
    fn merged_result_stays_sorted() {
        let parent = weekly_parent();
        let from = dt(2026, 3, 1, 0, 0);
        let to = dt(2026, 3, 31, 0, 0);
        let instances = expand(&parent, from, to).unwrap();

        // Move the first occurrence after the last one.
        let moved = override_for(1, dt(2026, 3, 2, 9, 0), dt(2026, 3, 28, 9, 0));
        let merged = apply_overrides(instances, std::slice::from_ref(&moved), from, to);

        let starts: Vec<_> = merged.iter().map(|i| i.event.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn no_overrides_is_a_passthrough() {
        let parent = weekly_parent();
        let from = dt(2026, 3, 1, 0, 0);
        let to = dt(2026, 3, 31, 0, 0);
        let instances = expand(&parent, from, to).unwrap();
        let merged = apply_overrides(instances.clone(), &[], from, to);
        assert_eq!(merged, instances);
    }
}
