//! Data models
//!
//! Shared between the billing engine and whatever transport wraps it.
//! Money is `Decimal` here; the engine stores minor units.
//! Plain flag/count rows use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.

pub mod ledger;
pub mod member;
pub mod owner;
pub mod rollup;
pub mod status;

// Re-exports
pub use ledger::*;
pub use member::*;
pub use owner::*;
pub use rollup::*;
pub use status::*;
