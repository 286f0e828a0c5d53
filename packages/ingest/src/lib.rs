#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Daily ingestion worker for web-analytics metrics.
//!
//! [`run`] walks a window of past days oldest-first. For each day it
//! creates the day row, fetches every configured [`cases::MetricCase`]
//! from the reporting API, and feeds each record through the row-upsert
//! layer in [`rows`]. A day whose batch fails partway is deleted again —
//! fact rows and day row — so a later run can retry it; days completed
//! earlier in the same run stay committed. A day that already exists
//! aborts the rest of the run untouched, since forcing re-ingestion
//! would duplicate facts.
//!
//! `run` is the single broad guard of the pipeline: nothing below it
//! escapes to the caller. Failures are logged and summarized in the
//! returned [`RunReport`], which is what makes the job safe to re-run
//! from a scheduler.
//!
//! Precondition: at most one worker run is active at a time. There is no
//! run-level lock; concurrent runs would race on day creation and
//! reference-entity deduplication.

pub mod api;
pub mod cases;
pub mod config;
pub mod rows;

use async_trait::async_trait;
use chrono::NaiveDate;
use duckdb::Connection;
use traffic_map_database::days::{self, DayCreation};
use traffic_map_geocoder::ResolvedPlace;
use traffic_map_metrics_models::MetricRecord;

use crate::cases::MetricCase;

/// Errors that can abort a single day's ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Store operation failed.
    #[error("Database error: {0}")]
    Db(#[from] traffic_map_database::DbError),

    /// A record did not have the shape its case expects.
    #[error("Record error: {0}")]
    Record(#[from] traffic_map_metrics_models::RecordError),

    /// A request could not be sent.
    #[error("Fetch error: {0}")]
    Fetch(#[from] traffic_map_fetch::FetchError),

    /// The geocoder could not be reached.
    #[error("Geocode error: {0}")]
    Geocode(#[from] traffic_map_geocoder::GeocodeError),

    /// An hourly record referenced an hour outside the seeded 24.
    #[error("Unknown hour `{name}`")]
    UnknownHour {
        /// The hour name the record carried.
        name: String,
    },
}

/// The reporting-API seam: fetches one metric case for one day.
///
/// The production implementation is [`api::HttpMetricsApi`]; tests
/// inject scripted fakes.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    /// Fetches the `data` records for `case` on `date`.
    ///
    /// An upstream "no data" condition is an empty list, not an error.
    async fn fetch_case(
        &self,
        case: MetricCase,
        date: NaiveDate,
    ) -> Result<Vec<MetricRecord>, IngestError>;
}

/// The geocoding seam used when a new city is first observed.
#[async_trait]
pub trait CityResolver: Send + Sync {
    /// Resolves a city name to coordinates, using the sentinel for a
    /// miss (see [`traffic_map_geocoder::resolve`]).
    async fn resolve(
        &self,
        city_name: &str,
        country_hint: &str,
    ) -> Result<ResolvedPlace, IngestError>;
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every requested day was ingested.
    Completed,
    /// `delta_days` was not a positive count; nothing was touched.
    InvalidDeltaDays,
    /// This date was already ingested; the run stopped there, leaving
    /// the existing data alone.
    DuplicateDay(NaiveDate),
    /// This day's batch failed and was rolled back; the run stopped.
    DayFailed(NaiveDate),
}

/// Summary of one worker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Days fully ingested and kept, oldest first.
    pub days_completed: Vec<NaiveDate>,
}

/// Ingests the `delta_days` days preceding today, oldest first.
///
/// Never returns an error and never panics: every failure mode is
/// logged and reported through the [`RunReport`].
pub async fn run(
    conn: &Connection,
    api: &dyn MetricsApi,
    resolver: &dyn CityResolver,
    delta_days: i64,
) -> RunReport {
    run_from(conn, api, resolver, delta_days, chrono::Utc::now().date_naive()).await
}

/// [`run`] with an explicit "today", for deterministic scheduling and
/// tests.
pub async fn run_from(
    conn: &Connection,
    api: &dyn MetricsApi,
    resolver: &dyn CityResolver,
    delta_days: i64,
    today: NaiveDate,
) -> RunReport {
    if delta_days < 1 {
        log::error!("Parameter `delta_days` must be a positive number of days, got {delta_days}");
        return RunReport {
            outcome: RunOutcome::InvalidDeltaDays,
            days_completed: Vec::new(),
        };
    }

    let mut days_completed = Vec::new();

    for i in (1..=delta_days).rev() {
        let work_date = today - chrono::Duration::days(i);

        let creation = match days::create_day(conn, work_date) {
            Ok(creation) => creation,
            Err(e) => {
                log::error!("Failed to create day row for {work_date}: {e}");
                return RunReport {
                    outcome: RunOutcome::DayFailed(work_date),
                    days_completed,
                };
            }
        };

        let day_id = match creation {
            DayCreation::Existing(_) => {
                log::error!("{work_date} is already ingested; aborting the rest of the run");
                return RunReport {
                    outcome: RunOutcome::DuplicateDay(work_date),
                    days_completed,
                };
            }
            DayCreation::Created(id) => id,
        };

        if let Err(e) = process_day(conn, api, resolver, day_id, work_date).await {
            log::error!("Ingestion for {work_date} failed: {e}; rolling the day back");
            if let Err(cleanup) = days::delete_day(conn, day_id) {
                log::error!("Cleanup for {work_date} also failed: {cleanup}");
            }
            return RunReport {
                outcome: RunOutcome::DayFailed(work_date),
                days_completed,
            };
        }

        log::info!("Ingested {work_date}");
        days_completed.push(work_date);
    }

    RunReport {
        outcome: RunOutcome::Completed,
        days_completed,
    }
}

async fn process_day(
    conn: &Connection,
    api: &dyn MetricsApi,
    resolver: &dyn CityResolver,
    day_id: i64,
    date: NaiveDate,
) -> Result<(), IngestError> {
    for case in MetricCase::ALL {
        let records = api.fetch_case(case, date).await?;
        log::info!("{case}: {} record(s) for {date}", records.len());

        for record in &records {
            rows::add_metric_row(conn, resolver, case, day_id, record).await?;
        }
    }

    Ok(())
}
