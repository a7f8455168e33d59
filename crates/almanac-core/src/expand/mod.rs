//! Occurrence expansion for recurring events.
//!
//! [`expand`] turns one recurring event plus a half-open query window into
//! concrete occurrence instances; [`apply_overrides`] then substitutes
//! stored per-instance overrides into the expanded list.

mod engine;
mod merge;

pub use engine::{Instance, MAX_CANDIDATES, RDATE_INDEX, expand};
pub use merge::apply_overrides;
