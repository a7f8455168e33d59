//! iCalendar structural types (RFC 5545 §3.1, §3.4-3.6).
//!
//! These are the raw building blocks the parser produces: content lines
//! with their parameters, segmented into a component tree. Interpretation
//! of property values happens later, in the decoder.

mod component;
mod parameter;
mod property;

pub use component::{Component, ComponentKind};
pub use parameter::Parameter;
pub use property::ContentLine;
