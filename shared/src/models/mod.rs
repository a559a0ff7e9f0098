//! Data models
//!
//! Shared between gallery-server and API consumers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.

pub mod image;

// Re-exports
pub use image::*;
