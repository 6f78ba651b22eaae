//! SQLite implementation of the marketplace backend.
//!
//! Cars, the charge schedule, inspection sessions and financing applications
//! live in one database file. Use [`SqliteBackendFactory`] with a
//! [`checkout_core::BackendRegistry`], or [`SqliteBackend`] directly when the
//! inventory needs writing.

pub mod decimal;
mod factory;
mod repository;

pub use factory::{seeds_dir, SqliteBackendFactory};
pub use repository::{SqliteBackend, SIMILAR_CARS_LIMIT};
