//! Production implementations of the worker's upstream seams.

use async_trait::async_trait;
use chrono::NaiveDate;
use traffic_map_geocoder::ResolvedPlace;
use traffic_map_metrics_models::MetricRecord;

use crate::cases::MetricCase;
use crate::config::Config;
use crate::{CityResolver, IngestError, MetricsApi};

/// Reporting-API client: one GET per (case, day), query parameters
/// merged from the case's dimension/metric keys and a one-day date
/// range (`date1 = date2 = work date`).
pub struct HttpMetricsApi {
    client: reqwest::Client,
    config: Config,
}

impl HttpMetricsApi {
    /// Builds the client from the resolved configuration.
    #[must_use]
    pub const fn new(client: reqwest::Client, config: Config) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl MetricsApi for HttpMetricsApi {
    async fn fetch_case(
        &self,
        case: MetricCase,
        date: NaiveDate,
    ) -> Result<Vec<MetricRecord>, IngestError> {
        let day = date.format("%Y-%m-%d").to_string();
        let ids = self.config.counter_id.to_string();
        let auth = self.config.auth_header();

        let body = traffic_map_fetch::get_json(
            &self.client,
            &self.config.report_url,
            &[
                ("ids", ids.as_str()),
                ("date1", day.as_str()),
                ("date2", day.as_str()),
                ("dimensions", case.dimensions()),
                ("metrics", case.metrics()),
            ],
            &[("Authorization", auth.as_str())],
        )
        .await?;

        Ok(MetricRecord::list_from_body(&body)?)
    }
}

/// Geocoding client wrapping the normalize-and-retry resolver.
pub struct HttpCityResolver {
    client: reqwest::Client,
    geocoder_url: String,
}

impl HttpCityResolver {
    /// Builds the resolver against the configured geocoding endpoint.
    #[must_use]
    pub const fn new(client: reqwest::Client, geocoder_url: String) -> Self {
        Self {
            client,
            geocoder_url,
        }
    }
}

#[async_trait]
impl CityResolver for HttpCityResolver {
    async fn resolve(
        &self,
        city_name: &str,
        country_hint: &str,
    ) -> Result<ResolvedPlace, IngestError> {
        Ok(
            traffic_map_geocoder::resolve(&self.client, &self.geocoder_url, city_name, country_hint)
                .await?,
        )
    }
}
