//! iCalendar serialization (RFC 5545).

mod escape;
mod serializer;

pub use escape::escape_text;
pub use serializer::encode;
