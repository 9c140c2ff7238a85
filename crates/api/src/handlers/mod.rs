pub mod moderation;
pub mod ratings;
