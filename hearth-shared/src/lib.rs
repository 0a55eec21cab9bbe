//! # Hearth Shared Library
//!
//! Domain types and business logic for the Hearth reservation site, shared by the web
//! server and the integration tests.
//!
//! ## Module Organization
//!
//! - `models`: rooms, restrictions, reservations and users
//! - `dates`: calendar dates and half-open date ranges
//! - `forms`: form validation
//! - `repository`: storage contract with PostgreSQL and in-memory variants
//! - `booking`: the reservation submission flow
//! - `auth`: password hashing
//! - `db`: connection pool and migrations

pub mod auth;
pub mod booking;
pub mod dates;
pub mod db;
pub mod forms;
pub mod models;
pub mod repository;

/// Current version of the Hearth shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
