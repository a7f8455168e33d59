//! iCalendar (RFC 5545) codec for the almanac calendar service.
//!
//! Decoding turns an iCalendar document into [`almanac_core::model::Event`]
//! records; encoding does the reverse. Only VEVENT, VALARM and VTIMEZONE
//! components are interpreted; everything else is carried past without
//! error.

pub mod error;
pub mod ical;
