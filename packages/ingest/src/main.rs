#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the metrics ingestion worker.

use clap::{Parser, Subcommand};
use traffic_map_database::{queries, store};
use traffic_map_ingest::api::{HttpCityResolver, HttpMetricsApi};
use traffic_map_ingest::cases::MetricCase;
use traffic_map_ingest::config::Config;
use traffic_map_ingest::{RunOutcome, run};

#[derive(Parser)]
#[command(name = "traffic_map_ingest", about = "Web-analytics metrics ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the metrics of the preceding days (intended for a daily
    /// cron invocation)
    Run {
        /// How many days back to ingest, ending yesterday
        #[arg(long, default_value = "1")]
        days: i64,
    },
    /// Create the store and schema without ingesting anything
    Init,
    /// List the configured metric cases
    Cases,
    /// Print ingested aggregates for a date range
    Summary {
        /// Range start, `YYYY-MM-DD`
        #[arg(long)]
        start: String,
        /// Range end, `YYYY-MM-DD`
        #[arg(long)]
        end: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { days } => {
            let config = Config::from_env()?;
            let conn = store::open_default()?;
            let client = traffic_map_fetch::client()?;

            let api = HttpMetricsApi::new(client.clone(), config.clone());
            let resolver = HttpCityResolver::new(client, config.geocoder_url.clone());

            let report = run(&conn, &api, &resolver, days).await;
            match report.outcome {
                RunOutcome::Completed => {
                    log::info!("Run complete: {} day(s) ingested", report.days_completed.len());
                }
                RunOutcome::InvalidDeltaDays => {
                    log::error!("Run rejected: --days must be positive");
                }
                RunOutcome::DuplicateDay(date) => {
                    log::warn!(
                        "Run stopped at already-ingested {date} ({} day(s) ingested before it)",
                        report.days_completed.len()
                    );
                }
                RunOutcome::DayFailed(date) => {
                    log::warn!(
                        "Run stopped: {date} failed and was rolled back ({} day(s) kept)",
                        report.days_completed.len()
                    );
                }
            }
        }
        Commands::Init => {
            let conn = store::open_default()?;
            drop(conn);
            log::info!(
                "Store ready at {}",
                traffic_map_database::paths::metrics_db_path().display()
            );
        }
        Commands::Cases => {
            println!("{:<25} {:<25} METRICS", "CASE", "DIMENSIONS");
            println!("{}", "-".repeat(70));
            for case in MetricCase::ALL {
                println!("{case:<25} {:<25} {}", case.dimensions(), case.metrics());
            }
        }
        Commands::Summary { start, end } => {
            let conn = store::open_default()?;

            match (queries::min_date(&conn)?, queries::max_date(&conn)?) {
                (Some(min), Some(max)) => println!("Store covers {min} .. {max}"),
                _ => println!("Store is empty"),
            }

            println!("\nVisits by hour:");
            for (hour, visits) in queries::visits_by_hour_range(&conn, &start, &end)? {
                println!("  {hour}  {visits}");
            }

            println!("\nPage views by device:");
            for (device, views) in queries::page_views_by_device_range(&conn, &start, &end)? {
                println!("  {device}  {views}");
            }

            println!("\nVisits by traffic source:");
            for (source, visits) in queries::visits_by_traffic_source_range(&conn, &start, &end)? {
                println!("  {source}  {visits}");
            }

            println!("\nVisitors by city:");
            for city in queries::city_visitors_range(&conn, &start, &end)? {
                let code = if city.code_country.is_empty() {
                    "??"
                } else {
                    &city.code_country
                };
                println!(
                    "  {} ({code})  {} visitors at ({:.4}, {:.4})",
                    city.name, city.users_count, city.lat, city.long
                );
            }
        }
    }

    Ok(())
}
