//! Reference-entity tables: hours, cities, devices, traffic sources.
//!
//! All four are deduplicated by an external identifier from the
//! reporting API and created lazily the first time a new id is
//! observed. Rows are append-only and shared across ingestion runs;
//! nothing here is ever updated or deleted. Hours are the exception to
//! lazy creation — the 24 rows are seeded at schema bootstrap and a
//! missing hour is a caller error.

use duckdb::Connection;

use crate::DbError;

/// A city row to insert, with coordinates already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCity {
    /// External city id from the reporting API.
    pub city: i64,
    /// Display name as the reporting API sends it (slug form).
    pub name: String,
    /// Two-letter country code, or empty for an unknown location.
    pub code_country: String,
    /// Latitude, `0.0` for an unknown location.
    pub lat: f64,
    /// Longitude, `0.0` for an unknown location.
    pub long: f64,
}

/// Looks up an hour-of-day row id by its `HH:MM:SS` name.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn hour_id(conn: &Connection, name: &str) -> Result<Option<i64>, DbError> {
    find_id(conn, "SELECT id FROM hours_in_day WHERE name = ?", name)
}

/// Looks up a city row id by the reporting API's city id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn find_city(conn: &Connection, city: i64) -> Result<Option<i64>, DbError> {
    let mut stmt = conn.prepare("SELECT id FROM cities WHERE city = ?")?;
    match stmt.query_row(duckdb::params![city], |row| row.get(0)) {
        Ok(id) => Ok(Some(id)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Inserts a new city row and returns its id.
///
/// Coordinates are written once, at creation, and never revisited —
/// even the `(0, 0, "")` sentinel for an unresolvable city is kept.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_city(conn: &Connection, city: &NewCity) -> Result<i64, DbError> {
    let mut stmt = conn.prepare(
        "INSERT INTO cities (city, name, code_country, lat, \"long\")
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )?;
    let id: i64 = stmt.query_row(
        duckdb::params![city.city, city.name, city.code_country, city.lat, city.long],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Looks up a device by its external id, inserting it with the given
/// display name on first sight.
///
/// # Errors
///
/// Returns [`DbError`] if the lookup or insert fails.
pub fn find_or_insert_device(conn: &Connection, device: &str, name: &str) -> Result<i64, DbError> {
    if let Some(id) = find_id(conn, "SELECT id FROM devices WHERE device = ?", device)? {
        return Ok(id);
    }

    let mut stmt = conn.prepare("INSERT INTO devices (device, name) VALUES (?, ?) RETURNING id")?;
    let id: i64 = stmt.query_row(duckdb::params![device, name], |row| row.get(0))?;
    Ok(id)
}

/// Looks up a traffic source by its external id, inserting it with the
/// given display name on first sight.
///
/// # Errors
///
/// Returns [`DbError`] if the lookup or insert fails.
pub fn find_or_insert_traffic_source(
    conn: &Connection,
    traffic_source: &str,
    name: &str,
) -> Result<i64, DbError> {
    if let Some(id) = find_id(
        conn,
        "SELECT id FROM traffic_sources WHERE traffic_source = ?",
        traffic_source,
    )? {
        return Ok(id);
    }

    let mut stmt = conn
        .prepare("INSERT INTO traffic_sources (traffic_source, name) VALUES (?, ?) RETURNING id")?;
    let id: i64 = stmt.query_row(duckdb::params![traffic_source, name], |row| row.get(0))?;
    Ok(id)
}

fn find_id(conn: &Connection, sql: &str, key: &str) -> Result<Option<i64>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    match stmt.query_row([key], |row| row.get(0)) {
        Ok(id) => Ok(Some(id)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}
