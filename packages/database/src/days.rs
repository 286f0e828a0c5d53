//! Day-row lifecycle.
//!
//! A day row anchors all fact rows for one calendar date. It is created
//! once, the first time metrics for that date are ingested, and deleted
//! only by the worker's cleanup path when that day's batch fails. A day
//! that already exists when ingestion starts is prior legitimate data
//! and is never touched.

use chrono::NaiveDate;
use duckdb::Connection;

use crate::DbError;

/// Outcome of [`create_day`]: whether the row was freshly created or
/// already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCreation {
    /// The day row was inserted by this call.
    Created(i64),
    /// A row for this date already existed (previously ingested).
    Existing(i64),
}

impl DayCreation {
    /// The day row id, regardless of how it was obtained.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Created(id) | Self::Existing(id) => id,
        }
    }
}

/// Creates the day row for `date`, or reports the existing one.
///
/// # Errors
///
/// Returns [`DbError`] if the lookup or insert fails.
pub fn create_day(conn: &Connection, date: NaiveDate) -> Result<DayCreation, DbError> {
    if let Some(id) = day_id_by_date(conn, date)? {
        return Ok(DayCreation::Existing(id));
    }

    let mut stmt = conn.prepare("INSERT INTO days (date) VALUES (?) RETURNING id")?;
    let id: i64 = stmt.query_row([date.format("%Y-%m-%d").to_string()], |row| row.get(0))?;
    Ok(DayCreation::Created(id))
}

/// Looks up the day row id for a date.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn day_id_by_date(conn: &Connection, date: NaiveDate) -> Result<Option<i64>, DbError> {
    let mut stmt = conn.prepare("SELECT id FROM days WHERE date = ?")?;
    let result = stmt.query_row([date.format("%Y-%m-%d").to_string()], |row| row.get(0));
    match result {
        Ok(id) => Ok(Some(id)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Deletes a day row and every fact row referencing it.
///
/// This is the worker's cleanup path for a failed day. Fact rows go
/// first, then the day row itself; reference entities are shared and
/// stay.
///
/// # Errors
///
/// Returns [`DbError`] if any delete fails.
pub fn delete_day(conn: &Connection, day_id: i64) -> Result<(), DbError> {
    for table in [
        "visits_by_hour",
        "page_views_by_device",
        "visits_by_traffic_source",
        "visits_by_region",
    ] {
        conn.execute(
            &format!("DELETE FROM {table} WHERE day_id = ?"),
            duckdb::params![day_id],
        )?;
    }

    conn.execute("DELETE FROM days WHERE id = ?", duckdb::params![day_id])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn create_then_reencounter() {
        let conn = open_in_memory().unwrap();

        let first = create_day(&conn, date("2024-03-08")).unwrap();
        let DayCreation::Created(id) = first else {
            panic!("expected Created, got {first:?}");
        };

        let second = create_day(&conn, date("2024-03-08")).unwrap();
        assert_eq!(second, DayCreation::Existing(id));
    }

    #[test]
    fn distinct_dates_get_distinct_ids() {
        let conn = open_in_memory().unwrap();
        let a = create_day(&conn, date("2024-03-08")).unwrap().id();
        let b = create_day(&conn, date("2024-03-09")).unwrap().id();
        assert_ne!(a, b);
    }

    #[test]
    fn delete_removes_day_and_facts() {
        let conn = open_in_memory().unwrap();
        let day_id = create_day(&conn, date("2024-03-08")).unwrap().id();

        crate::facts::insert_visits_by_hour(&conn, day_id, 15, 37).unwrap();
        crate::facts::insert_visits_by_region(&conn, day_id, 1, 5).unwrap();
        assert_eq!(crate::facts::fact_row_count(&conn, day_id).unwrap(), 2);

        delete_day(&conn, day_id).unwrap();

        assert_eq!(crate::facts::fact_row_count(&conn, day_id).unwrap(), 0);
        assert!(day_id_by_date(&conn, date("2024-03-08")).unwrap().is_none());
    }

    #[test]
    fn delete_leaves_other_days_alone() {
        let conn = open_in_memory().unwrap();
        let keep = create_day(&conn, date("2024-03-08")).unwrap().id();
        let doomed = create_day(&conn, date("2024-03-09")).unwrap().id();

        crate::facts::insert_visits_by_hour(&conn, keep, 15, 37).unwrap();
        crate::facts::insert_visits_by_hour(&conn, doomed, 15, 12).unwrap();

        delete_day(&conn, doomed).unwrap();

        assert_eq!(crate::facts::fact_row_count(&conn, keep).unwrap(), 1);
        assert!(day_id_by_date(&conn, date("2024-03-08")).unwrap().is_some());
    }
}
