//! Service layer between HTTP handlers and repositories.

pub mod ratings;

pub use ratings::RatingService;
