//! Fact-table inserts.
//!
//! One row per `(day, reference entity)` pair. Inserts are not
//! idempotent — re-ingesting a day without deleting its rows first
//! duplicates facts, so the worker enforces at-most-one ingestion per
//! day at the day-row level.

use duckdb::Connection;

use crate::DbError;

/// Inserts an hourly visit count.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_visits_by_hour(
    conn: &Connection,
    day_id: i64,
    hour_id: i64,
    visits: i64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO visits_by_hour (day_id, hour_id, visits) VALUES (?, ?, ?)",
        duckdb::params![day_id, hour_id, visits],
    )?;
    Ok(())
}

/// Inserts a per-device page-view count.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_page_views_by_device(
    conn: &Connection,
    day_id: i64,
    device_id: i64,
    page_views: i64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO page_views_by_device (day_id, device_id, page_views) VALUES (?, ?, ?)",
        duckdb::params![day_id, device_id, page_views],
    )?;
    Ok(())
}

/// Inserts a per-traffic-source visit count.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_visits_by_traffic_source(
    conn: &Connection,
    day_id: i64,
    traffic_source_id: i64,
    visits: i64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO visits_by_traffic_source (day_id, traffic_source_id, visits)
         VALUES (?, ?, ?)",
        duckdb::params![day_id, traffic_source_id, visits],
    )?;
    Ok(())
}

/// Inserts a per-city visitor count.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_visits_by_region(
    conn: &Connection,
    day_id: i64,
    city_id: i64,
    users_count: i64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO visits_by_region (day_id, city_id, users_count) VALUES (?, ?, ?)",
        duckdb::params![day_id, city_id, users_count],
    )?;
    Ok(())
}

/// Counts fact rows for one day across all four fact tables.
///
/// A day with zero fact rows is considered not-yet-ingested.
///
/// # Errors
///
/// Returns [`DbError`] if any count query fails.
pub fn fact_row_count(conn: &Connection, day_id: i64) -> Result<i64, DbError> {
    let mut total = 0i64;
    for table in [
        "visits_by_hour",
        "page_views_by_device",
        "visits_by_traffic_source",
        "visits_by_region",
    ] {
        let mut stmt = conn.prepare(&format!("SELECT COUNT(*) FROM {table} WHERE day_id = ?"))?;
        let count: i64 = stmt.query_row(duckdb::params![day_id], |row| row.get(0))?;
        total += count;
    }
    Ok(total)
}

/// Counts fact rows across all days and tables, for the zero-writes
/// assertions in worker tests.
///
/// # Errors
///
/// Returns [`DbError`] if any count query fails.
pub fn total_fact_rows(conn: &Connection) -> Result<i64, DbError> {
    let mut total = 0i64;
    for table in [
        "days",
        "visits_by_hour",
        "page_views_by_device",
        "visits_by_traffic_source",
        "visits_by_region",
    ] {
        let mut stmt = conn.prepare(&format!("SELECT COUNT(*) FROM {table}"))?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        total += count;
    }
    Ok(total)
}
