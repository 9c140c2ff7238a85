//! Domain logic for the moodbase ratings service.
//!
//! Everything in this crate is pure: no I/O, no database handles. The
//! `db` and `api` crates build on these types and validation rules.

pub mod error;
pub mod moderation;
pub mod platform;
pub mod rating;
pub mod types;
