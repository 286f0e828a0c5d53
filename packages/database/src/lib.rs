#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` store for ingested web-analytics metrics.
//!
//! One file under `data/` holds the day anchor table, the four reference
//! dimension tables (hours, cities, devices, traffic sources), and the
//! four fact tables keyed by `(day_id, <reference>_id)`. Reference rows
//! are append-only and shared across runs; day rows and their facts are
//! owned by a single ingestion run, which deletes them again if that
//! day's batch fails partway.
//!
//! The store assumes a single writer. Concurrent runs would race on day
//! creation and reference-entity deduplication; the scheduler must not
//! overlap invocations.

pub mod days;
pub mod dimensions;
pub mod facts;
pub mod paths;
pub mod queries;
pub mod store;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("Database error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Filesystem error while preparing the data directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
