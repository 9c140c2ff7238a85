//! Row structs and DTOs.
//!
//! Each submodule contains `FromRow` + `Serialize` structs matching database
//! rows and the DTOs used for inserts.

pub mod platform_rating;
pub mod rating;
