//! Codec tests over complete documents.

mod round_trip;
