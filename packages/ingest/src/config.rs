//! Runtime configuration for the ingestion worker.
//!
//! Endpoint defaults are embedded from `endpoints.toml` at compile time
//! and can be overridden through the environment. The reporting-API
//! OAuth token never lives in a file — it comes from
//! `TRAFFIC_MAP_TOKEN` only.

use serde::Deserialize;
use thiserror::Error;

/// Embedded endpoint defaults.
const ENDPOINTS_TOML: &str = include_str!("../endpoints.toml");

/// Environment variable names.
const ENV_TOKEN: &str = "TRAFFIC_MAP_TOKEN";
const ENV_COUNTER_ID: &str = "TRAFFIC_MAP_COUNTER_ID";
const ENV_REPORT_URL: &str = "TRAFFIC_MAP_REPORT_URL";
const ENV_GEOCODER_URL: &str = "TRAFFIC_MAP_GEOCODER_URL";

/// Errors while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The embedded endpoint TOML is malformed.
    #[error("Malformed endpoints.toml: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required environment variable is missing.
    #[error("Environment variable `{name}` is not set")]
    MissingEnv {
        /// Name of the missing variable.
        name: &'static str,
    },

    /// An override variable did not parse.
    #[error("Environment variable `{name}` is not a valid {expected}")]
    InvalidEnv {
        /// Name of the offending variable.
        name: &'static str,
        /// What it should have been.
        expected: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct Endpoints {
    report_url: String,
    geocoder_url: String,
    counter_id: u64,
}

/// Fully-resolved worker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reporting-API statistics endpoint.
    pub report_url: String,
    /// Geocoding endpoint.
    pub geocoder_url: String,
    /// Reporting-API counter (site) id.
    pub counter_id: u64,
    /// OAuth token for the reporting API.
    pub token: String,
}

impl Config {
    /// Loads the embedded defaults and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the token is unset or an override
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoints: Endpoints = toml::de::from_str(ENDPOINTS_TOML)?;

        let token = std::env::var(ENV_TOKEN)
            .map_err(|_| ConfigError::MissingEnv { name: ENV_TOKEN })?;

        let counter_id = match std::env::var(ENV_COUNTER_ID) {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_COUNTER_ID,
                expected: "integer",
            })?,
            Err(_) => endpoints.counter_id,
        };

        Ok(Self {
            report_url: std::env::var(ENV_REPORT_URL).unwrap_or(endpoints.report_url),
            geocoder_url: std::env::var(ENV_GEOCODER_URL).unwrap_or(endpoints.geocoder_url),
            counter_id,
            token,
        })
    }

    /// The `Authorization` header value for the reporting API.
    #[must_use]
    pub fn auth_header(&self) -> String {
        format!("OAuth {}", self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_endpoints_parse() {
        let endpoints: Endpoints = toml::de::from_str(ENDPOINTS_TOML).unwrap();
        assert!(endpoints.report_url.starts_with("https://"));
        assert!(endpoints.geocoder_url.starts_with("https://"));
    }

    #[test]
    fn auth_header_is_oauth() {
        let config = Config {
            report_url: String::new(),
            geocoder_url: String::new(),
            counter_id: 1,
            token: "secret".into(),
        };
        assert_eq!(config.auth_header(), "OAuth secret");
    }
}
