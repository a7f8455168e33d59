//! Core model and recurrence expansion for the almanac calendar service.
//!
//! This crate is the storage- and transport-agnostic heart of the service:
//! the [`model::Event`] record, recurrence rule types, validation, the
//! recurrence expansion engine, and per-instance override merging. All of
//! it is pure, synchronous computation over plain values; persistence and
//! HTTP live elsewhere.

pub mod error;
pub mod expand;
pub mod model;
