//! Connection and schema bootstrap for the metrics `DuckDB`.
//!
//! Dates and hour names are stored as ISO-formatted TEXT so range
//! predicates sort lexically without cast games. No foreign-key
//! constraints are declared; the day cleanup path deletes fact rows
//! explicitly before the day row.

use std::path::Path;

use duckdb::Connection;

use crate::DbError;

/// Opens (or creates) the metrics `DuckDB` and ensures the schema and
/// seed rows exist.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    log::debug!("Opened metrics store at {}", path.display());
    Ok(conn)
}

/// Opens the metrics store at the default path.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_default() -> Result<Connection, DbError> {
    open(&crate::paths::metrics_db_path())
}

/// Opens an in-memory store with the full schema, for tests.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE SEQUENCE IF NOT EXISTS days_id_seq;
        CREATE TABLE IF NOT EXISTS days (
            id BIGINT PRIMARY KEY DEFAULT nextval('days_id_seq'),
            date TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS hours_in_day (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        CREATE SEQUENCE IF NOT EXISTS cities_id_seq;
        CREATE TABLE IF NOT EXISTS cities (
            id BIGINT PRIMARY KEY DEFAULT nextval('cities_id_seq'),
            city BIGINT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            code_country TEXT NOT NULL,
            lat DOUBLE NOT NULL,
            \"long\" DOUBLE NOT NULL
        );

        CREATE SEQUENCE IF NOT EXISTS devices_id_seq;
        CREATE TABLE IF NOT EXISTS devices (
            id BIGINT PRIMARY KEY DEFAULT nextval('devices_id_seq'),
            device TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        );

        CREATE SEQUENCE IF NOT EXISTS traffic_sources_id_seq;
        CREATE TABLE IF NOT EXISTS traffic_sources (
            id BIGINT PRIMARY KEY DEFAULT nextval('traffic_sources_id_seq'),
            traffic_source TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS visits_by_hour (
            day_id BIGINT NOT NULL,
            hour_id BIGINT NOT NULL,
            visits BIGINT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS page_views_by_device (
            day_id BIGINT NOT NULL,
            device_id BIGINT NOT NULL,
            page_views BIGINT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS visits_by_traffic_source (
            day_id BIGINT NOT NULL,
            traffic_source_id BIGINT NOT NULL,
            visits BIGINT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS visits_by_region (
            day_id BIGINT NOT NULL,
            city_id BIGINT NOT NULL,
            users_count BIGINT NOT NULL
        );",
    )?;

    seed_hours(conn)?;

    Ok(())
}

/// Seeds the 24 hour-of-day reference rows (`00:00:00` .. `23:00:00`).
fn seed_hours(conn: &Connection) -> Result<(), DbError> {
    let mut stmt = conn.prepare(
        "INSERT INTO hours_in_day (id, name) VALUES (?, ?)
         ON CONFLICT (id) DO NOTHING",
    )?;
    for hour in 0..24 {
        stmt.execute(duckdb::params![hour + 1, format!("{hour:0>2}:00:00")])?;
    }
    Ok(())
}
