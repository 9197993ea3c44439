//! `PostgreSQL` persistence for provinces.
//!
//! This crate provides the durable [`ProvinceStore`] implementation used
//! when a `DATABASE_URL` is configured. Processes started without one use
//! the in-memory store from `nuclick-core` instead.
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool, configuration and migrations
//! - [`province_store`] -- [`PgProvinceStore`], the `provinces` table
//! - [`error`] -- Shared error types
//!
//! [`ProvinceStore`]: nuclick_core::ProvinceStore

pub mod error;
pub mod postgres;
pub mod province_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use province_store::{PgProvinceStore, ProvinceRow};
