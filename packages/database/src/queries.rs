//! Read-side queries for downstream consumers (dashboards, summaries).
//!
//! These only expose what the ingestion core wrote: joined name/value
//! pairs per fact table over an inclusive date range, plus the date
//! bounds of the store. Dates are ISO `YYYY-MM-DD` strings.

use duckdb::Connection;

use crate::DbError;

/// A per-city visitor aggregate over a date range.
#[derive(Debug, Clone, PartialEq)]
pub struct CityVisitors {
    /// City display name.
    pub name: String,
    /// Two-letter country code, empty when geocoding missed.
    pub code_country: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub long: f64,
    /// Summed visitor count.
    pub users_count: i64,
}

/// Returns the earliest ingested date, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn min_date(conn: &Connection) -> Result<Option<String>, DbError> {
    date_bound(conn, "SELECT MIN(date) FROM days")
}

/// Returns the latest ingested date, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn max_date(conn: &Connection) -> Result<Option<String>, DbError> {
    date_bound(conn, "SELECT MAX(date) FROM days")
}

fn date_bound(conn: &Connection, sql: &str) -> Result<Option<String>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let bound: Option<String> = stmt.query_row([], |row| row.get(0))?;
    Ok(bound)
}

/// Hourly visit counts over a date range, joined with the hour name.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn visits_by_hour_range(
    conn: &Connection,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<(String, i64)>, DbError> {
    name_value_range(
        conn,
        "SELECT h.name, f.visits
         FROM visits_by_hour f
         JOIN hours_in_day h ON f.hour_id = h.id
         JOIN days d ON f.day_id = d.id
         WHERE d.date >= ? AND d.date <= ?
         ORDER BY d.date, f.hour_id",
        start_date,
        end_date,
    )
}

/// Per-device page-view counts over a date range.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn page_views_by_device_range(
    conn: &Connection,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<(String, i64)>, DbError> {
    name_value_range(
        conn,
        "SELECT v.name, f.page_views
         FROM page_views_by_device f
         JOIN devices v ON f.device_id = v.id
         JOIN days d ON f.day_id = d.id
         WHERE d.date >= ? AND d.date <= ?
         ORDER BY d.date, f.device_id",
        start_date,
        end_date,
    )
}

/// Per-traffic-source visit counts over a date range.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn visits_by_traffic_source_range(
    conn: &Connection,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<(String, i64)>, DbError> {
    name_value_range(
        conn,
        "SELECT t.name, f.visits
         FROM visits_by_traffic_source f
         JOIN traffic_sources t ON f.traffic_source_id = t.id
         JOIN days d ON f.day_id = d.id
         WHERE d.date >= ? AND d.date <= ?
         ORDER BY d.date, f.traffic_source_id",
        start_date,
        end_date,
    )
}

fn name_value_range(
    conn: &Connection,
    sql: &str,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<(String, i64)>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([start_date, end_date])?;

    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        let value: i64 = row.get(1)?;
        results.push((name, value));
    }
    Ok(results)
}

/// Per-city visitor sums over a date range, with coordinates for the
/// map view.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn city_visitors_range(
    conn: &Connection,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<CityVisitors>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT c.name, c.code_country, c.lat, c.\"long\", CAST(SUM(f.users_count) AS BIGINT)
         FROM visits_by_region f
         JOIN cities c ON f.city_id = c.id
         JOIN days d ON f.day_id = d.id
         WHERE d.date >= ? AND d.date <= ?
         GROUP BY c.name, c.code_country, c.lat, c.\"long\"
         ORDER BY c.name",
    )?;
    let mut rows = stmt.query([start_date, end_date])?;

    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        results.push(CityVisitors {
            name: row.get(0)?,
            code_country: row.get(1)?,
            lat: row.get(2)?,
            long: row.get(3)?,
            users_count: row.get(4)?,
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::days::create_day;
    use crate::dimensions::{NewCity, find_or_insert_device, insert_city};
    use crate::facts;
    use crate::store::open_in_memory;

    #[test]
    fn date_bounds_track_ingested_days() {
        let conn = open_in_memory().unwrap();
        assert_eq!(min_date(&conn).unwrap(), None);

        create_day(&conn, "2024-03-08".parse().unwrap()).unwrap();
        create_day(&conn, "2024-03-09".parse().unwrap()).unwrap();

        assert_eq!(min_date(&conn).unwrap().as_deref(), Some("2024-03-08"));
        assert_eq!(max_date(&conn).unwrap().as_deref(), Some("2024-03-09"));
    }

    #[test]
    fn hour_range_joins_names() {
        let conn = open_in_memory().unwrap();
        let day = create_day(&conn, "2024-03-08".parse().unwrap()).unwrap().id();
        facts::insert_visits_by_hour(&conn, day, 15, 37).unwrap();

        let rows = visits_by_hour_range(&conn, "2024-03-08", "2024-03-08").unwrap();
        assert_eq!(rows, vec![("14:00:00".to_string(), 37)]);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let conn = open_in_memory().unwrap();
        let inside = create_day(&conn, "2024-03-08".parse().unwrap()).unwrap().id();
        let outside = create_day(&conn, "2024-03-10".parse().unwrap()).unwrap().id();
        let device = find_or_insert_device(&conn, "mobile", "Smartphones").unwrap();

        facts::insert_page_views_by_device(&conn, inside, device, 10).unwrap();
        facts::insert_page_views_by_device(&conn, outside, device, 99).unwrap();

        let rows = page_views_by_device_range(&conn, "2024-03-08", "2024-03-09").unwrap();
        assert_eq!(rows, vec![("Smartphones".to_string(), 10)]);
    }

    #[test]
    fn city_aggregate_sums_across_days() {
        let conn = open_in_memory().unwrap();
        let d1 = create_day(&conn, "2024-03-08".parse().unwrap()).unwrap().id();
        let d2 = create_day(&conn, "2024-03-09".parse().unwrap()).unwrap().id();
        let city = insert_city(
            &conn,
            &NewCity {
                city: 213,
                name: "moscow".into(),
                code_country: "RU".into(),
                lat: 55.755_864,
                long: 37.617_698,
            },
        )
        .unwrap();

        facts::insert_visits_by_region(&conn, d1, city, 5).unwrap();
        facts::insert_visits_by_region(&conn, d2, city, 7).unwrap();

        let rows = city_visitors_range(&conn, "2024-03-08", "2024-03-09").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].users_count, 12);
        assert_eq!(rows[0].code_country, "RU");
    }
}
