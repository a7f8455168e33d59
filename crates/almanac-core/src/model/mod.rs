//! Event model: records, recurrence rules, and the duration codec.

mod duration;
mod event;
mod recurrence;

pub use duration::parse_duration;
pub use event::{Event, EventKind, GeoPoint, ParentRef};
pub use recurrence::{Frequency, Recurrence, RecurrenceLimit, Weekday, WeekdayNum};
