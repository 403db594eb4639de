//! Shared types for the billing workspace
//!
//! Error codes, domain models and small utilities used by the engine and by
//! anything that wraps it.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};
