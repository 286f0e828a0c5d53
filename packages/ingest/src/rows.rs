//! The row-upsert layer: one reporting-API record in, one fact row out.
//!
//! Simple dimensions (hour, device, traffic source) look up or lazily
//! create their reference row, then insert the fact. The city dimension
//! additionally geocodes unseen cities: the resolver's triple is stored
//! with its first element in the `long` column and its second in `lat`,
//! and the sentinel triple is stored like any other — an unresolvable
//! city still gets a row.
//!
//! Nothing here is idempotent. The worker guarantees at-most-one
//! ingestion per day by owning the day row's lifecycle.

use duckdb::Connection;
use traffic_map_database::dimensions::{
    self, NewCity, find_city, find_or_insert_device, find_or_insert_traffic_source, insert_city,
};
use traffic_map_database::facts;
use traffic_map_metrics_models::MetricRecord;

use crate::cases::MetricCase;
use crate::{CityResolver, IngestError};

/// Persists one record into the fact table its case targets.
///
/// # Errors
///
/// Returns [`IngestError`] if the record is malformed, the resolver
/// fails, or a store operation fails. The worker treats any of these as
/// grounds to roll the day back.
pub async fn add_metric_row(
    conn: &Connection,
    resolver: &dyn CityResolver,
    case: MetricCase,
    day_id: i64,
    record: &MetricRecord,
) -> Result<(), IngestError> {
    match case {
        MetricCase::VisitsByHour => add_visits_by_hour(conn, day_id, record),
        MetricCase::PageViewsByDevice => add_page_views_by_device(conn, day_id, record),
        MetricCase::VisitsByTrafficSource => add_visits_by_traffic_source(conn, day_id, record),
        MetricCase::VisitsByRegion => add_visits_by_region(conn, resolver, day_id, record).await,
    }
}

fn add_visits_by_hour(
    conn: &Connection,
    day_id: i64,
    record: &MetricRecord,
) -> Result<(), IngestError> {
    let hour = record.primary_dimension()?.hour_name()?;
    let visits = record.primary_metric()?;

    let hour_id = dimensions::hour_id(conn, hour)?
        .ok_or_else(|| IngestError::UnknownHour { name: hour.into() })?;

    facts::insert_visits_by_hour(conn, day_id, hour_id, visits)?;
    Ok(())
}

fn add_page_views_by_device(
    conn: &Connection,
    day_id: i64,
    record: &MetricRecord,
) -> Result<(), IngestError> {
    let dimension = record.primary_dimension()?;
    let page_views = record.primary_metric()?;

    let device_id = find_or_insert_device(conn, dimension.id()?, dimension.name()?)?;

    facts::insert_page_views_by_device(conn, day_id, device_id, page_views)?;
    Ok(())
}

fn add_visits_by_traffic_source(
    conn: &Connection,
    day_id: i64,
    record: &MetricRecord,
) -> Result<(), IngestError> {
    let dimension = record.primary_dimension()?;
    let visits = record.primary_metric()?;

    let traffic_source_id =
        find_or_insert_traffic_source(conn, dimension.id()?, dimension.name()?)?;

    facts::insert_visits_by_traffic_source(conn, day_id, traffic_source_id, visits)?;
    Ok(())
}

async fn add_visits_by_region(
    conn: &Connection,
    resolver: &dyn CityResolver,
    day_id: i64,
    record: &MetricRecord,
) -> Result<(), IngestError> {
    let dimension = record.primary_dimension()?;
    let city = dimension.numeric_id()?;
    let users_count = record.primary_metric()?;

    let city_id = match find_city(conn, city)? {
        Some(id) => id,
        None => {
            let name = dimension.name()?;
            let place = resolver.resolve(name, dimension.country_hint()).await?;
            insert_city(
                conn,
                &NewCity {
                    city,
                    name: name.to_string(),
                    code_country: place.country_code,
                    lat: place.latitude,
                    long: place.longitude,
                },
            )?
        }
    };

    facts::insert_visits_by_region(conn, day_id, city_id, users_count)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use traffic_map_database::days::create_day;
    use traffic_map_database::store::open_in_memory;
    use traffic_map_geocoder::ResolvedPlace;
    use traffic_map_metrics_models::DimensionValue;

    struct FixedResolver {
        place: ResolvedPlace,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FixedResolver {
        fn new(place: ResolvedPlace) -> Self {
            Self {
                place,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CityResolver for FixedResolver {
        async fn resolve(
            &self,
            city_name: &str,
            country_hint: &str,
        ) -> Result<ResolvedPlace, IngestError> {
            self.calls
                .lock()
                .unwrap()
                .push((city_name.to_string(), country_hint.to_string()));
            Ok(self.place.clone())
        }
    }

    fn record(id: Option<&str>, name: &str, iso_name: Option<&str>, metric: f64) -> MetricRecord {
        MetricRecord {
            dimensions: vec![DimensionValue {
                id: id.map(String::from),
                name: Some(name.to_string()),
                iso_name: iso_name.map(String::from),
            }],
            metrics: vec![metric],
        }
    }

    #[tokio::test]
    async fn hour_row_uses_seeded_reference() {
        let conn = open_in_memory().unwrap();
        let day = create_day(&conn, "2024-03-08".parse().unwrap()).unwrap().id();
        let resolver = FixedResolver::new(ResolvedPlace::SENTINEL);

        add_metric_row(
            &conn,
            &resolver,
            MetricCase::VisitsByHour,
            day,
            &record(None, "Hour 14:00:00", None, 37.0),
        )
        .await
        .unwrap();

        let rows =
            traffic_map_database::queries::visits_by_hour_range(&conn, "2024-03-08", "2024-03-08")
                .unwrap();
        assert_eq!(rows, vec![("14:00:00".to_string(), 37)]);
    }

    #[tokio::test]
    async fn unknown_hour_is_an_error() {
        let conn = open_in_memory().unwrap();
        let day = create_day(&conn, "2024-03-08".parse().unwrap()).unwrap().id();
        let resolver = FixedResolver::new(ResolvedPlace::SENTINEL);

        let result = add_metric_row(
            &conn,
            &resolver,
            MetricCase::VisitsByHour,
            day,
            &record(None, "Hour 99:00:00", None, 1.0),
        )
        .await;

        assert!(matches!(result, Err(IngestError::UnknownHour { .. })));
    }

    #[tokio::test]
    async fn device_is_created_on_first_sight() {
        let conn = open_in_memory().unwrap();
        let day = create_day(&conn, "2024-03-08".parse().unwrap()).unwrap().id();
        let resolver = FixedResolver::new(ResolvedPlace::SENTINEL);

        for _ in 0..2 {
            add_metric_row(
                &conn,
                &resolver,
                MetricCase::PageViewsByDevice,
                day,
                &record(Some("mobile"), "Smartphones", None, 120.0),
            )
            .await
            .unwrap();
        }

        let mut stmt = conn.prepare("SELECT COUNT(*) FROM devices").unwrap();
        let devices: i64 = stmt.query_row([], |row| row.get(0)).unwrap();
        assert_eq!(devices, 1);
        assert_eq!(
            traffic_map_database::facts::fact_row_count(&conn, day).unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn new_city_is_geocoded_with_iso_hint() {
        let conn = open_in_memory().unwrap();
        let day = create_day(&conn, "2024-03-08".parse().unwrap()).unwrap().id();
        let resolver = FixedResolver::new(ResolvedPlace {
            longitude: 37.617_698,
            latitude: 55.755_864,
            country_code: "RU".into(),
        });

        add_metric_row(
            &conn,
            &resolver,
            MetricCase::VisitsByRegion,
            day,
            &record(Some("213"), "moscow", Some("RU MOW"), 14.0),
        )
        .await
        .unwrap();

        let calls = resolver.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("moscow".to_string(), "RU".to_string())]);

        // Resolver's first element lands in `long`, second in `lat`.
        let mut stmt = conn
            .prepare("SELECT \"long\", lat, code_country FROM cities WHERE city = 213")
            .unwrap();
        let (long, lat, code): (f64, f64, String) = stmt
            .query_row([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap();
        assert!((long - 37.617_698).abs() < 1e-6);
        assert!((lat - 55.755_864).abs() < 1e-6);
        assert_eq!(code, "RU");
    }

    #[tokio::test]
    async fn known_city_skips_the_resolver() {
        let conn = open_in_memory().unwrap();
        let day = create_day(&conn, "2024-03-08".parse().unwrap()).unwrap().id();
        let resolver = FixedResolver::new(ResolvedPlace::SENTINEL);

        let city_record = record(Some("213"), "moscow", Some("RU MOW"), 14.0);
        for _ in 0..2 {
            add_metric_row(&conn, &resolver, MetricCase::VisitsByRegion, day, &city_record)
                .await
                .unwrap();
        }

        assert_eq!(resolver.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sentinel_geocode_still_creates_the_city() {
        let conn = open_in_memory().unwrap();
        let day = create_day(&conn, "2024-03-08".parse().unwrap()).unwrap().id();
        let resolver = FixedResolver::new(ResolvedPlace::SENTINEL);

        add_metric_row(
            &conn,
            &resolver,
            MetricCase::VisitsByRegion,
            day,
            &record(Some("999"), "nowhere", None, 3.0),
        )
        .await
        .unwrap();

        let mut stmt = conn
            .prepare("SELECT \"long\", lat, code_country FROM cities WHERE city = 999")
            .unwrap();
        let (long, lat, code): (f64, f64, String) = stmt
            .query_row([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap();
        assert!(long.abs() < f64::EPSILON);
        assert!(lat.abs() < f64::EPSILON);
        assert!(code.is_empty());
        assert_eq!(
            traffic_map_database::facts::fact_row_count(&conn, day).unwrap(),
            1
        );
    }
}
