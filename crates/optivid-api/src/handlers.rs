//! HTTP handlers.

pub mod convert;
pub mod health;

pub use convert::{get_conversion_status, start_conversion};
pub use health::{health, ready};
