//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an open transaction) as the first argument.

pub mod platform_rating_repo;
pub mod staged_rating_repo;
pub mod user_rating_repo;

pub use platform_rating_repo::PlatformRatingRepo;
pub use staged_rating_repo::StagedRatingRepo;
pub use user_rating_repo::{AggregateSource, UserRatingRepo};
