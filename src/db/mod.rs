//! Database module for linkwatch.
//!
//! Provides the SQLite key-value store and the record types kept in it.

mod models;
mod store;

pub use models::*;
pub use store::*;
