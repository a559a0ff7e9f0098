//! Shared types for the gallery workspace
//!
//! Types used by the server and by API consumers: the unified error system
//! and the gallery image models / request DTOs.

pub mod error;
pub mod models;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
