#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! City-name geocoding for the region fact table.
//!
//! City names arrive from the reporting API in slug form (hyphenated),
//! while the geocoder expects natural-language names. [`resolve`] builds
//! an explicit attempt plan of at most two lookups — the name as given
//! and, if it contains a hyphen, the name with hyphens replaced by
//! spaces — and returns the first acceptable feature. When no hint is
//! supplied the name is normalized up front and there is nothing left to
//! retry with.
//!
//! A geocode miss is not an error: both attempts coming up empty yields
//! [`ResolvedPlace::SENTINEL`] so one unresolvable city cannot abort a
//! whole ingestion batch. Only transport failures propagate.

use serde_json::{Map, Value};
use thiserror::Error;
use traffic_map_fetch::FetchError;

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The lookup request could not be sent.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// A resolved place: coordinates plus the country code the caller
/// filtered by (empty when no hint was supplied).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Two-letter country code, or empty.
    pub country_code: String,
}

impl ResolvedPlace {
    /// The "unknown location" placeholder stored when geocoding misses.
    pub const SENTINEL: Self = Self {
        longitude: 0.0,
        latitude: 0.0,
        country_code: String::new(),
    };

    /// Whether this is the unknown-location placeholder.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

/// Builds the lookup attempt list for a city name.
///
/// - No country hint: one attempt, with separators already normalized.
/// - Hint present and the name contains a hyphen: the name as given,
///   then the normalized name.
/// - Hint present, no hyphen: one attempt with the name as given.
///
/// Termination is by construction — the list never exceeds two entries.
#[must_use]
pub fn attempt_plan(city_name: &str, country_hint: &str) -> Vec<String> {
    let normalized = city_name.replace('-', " ");
    if country_hint.is_empty() {
        vec![normalized]
    } else if city_name.contains('-') {
        vec![city_name.to_string(), normalized]
    } else {
        vec![city_name.to_string()]
    }
}

/// Resolves a city name to coordinates via the geocoding endpoint.
///
/// Runs the attempt plan sequentially and returns the first acceptable
/// feature, or [`ResolvedPlace::SENTINEL`] when every attempt misses.
///
/// # Errors
///
/// Returns [`GeocodeError`] only if a lookup request could not be sent;
/// a miss is reported through the sentinel, never as an error.
pub async fn resolve(
    client: &reqwest::Client,
    base_url: &str,
    city_name: &str,
    country_hint: &str,
) -> Result<ResolvedPlace, GeocodeError> {
    for attempt in attempt_plan(city_name, country_hint) {
        let body = traffic_map_fetch::get_json(
            client,
            base_url,
            &[("format", "json"), ("geocode", attempt.as_str())],
            &[],
        )
        .await?;

        if let Some(place) = scan_features(&body, country_hint) {
            return Ok(place);
        }
    }

    log::warn!("No geocode match for {city_name:?} (hint {country_hint:?})");
    Ok(ResolvedPlace::SENTINEL)
}

/// Scans a geocoder response for the first acceptable feature.
///
/// Features live at `response.GeoObjectCollection.featureMember[]`, each
/// wrapping a `GeoObject` with a `Point.pos` position string
/// (`"<lon> <lat>"`) and address metadata carrying a `country_code`.
/// With a non-empty hint, features whose country code differs are
/// skipped. Malformed position strings are skipped with a warning.
#[must_use]
pub fn scan_features(body: &Map<String, Value>, country_hint: &str) -> Option<ResolvedPlace> {
    let members = body
        .get("response")?
        .get("GeoObjectCollection")?
        .get("featureMember")?
        .as_array()?;

    for member in members {
        let object = &member["GeoObject"];

        if !country_hint.is_empty() {
            let feature_code = object["metaDataProperty"]["GeocoderMetaData"]["Address"]
                ["country_code"]
                .as_str();
            if feature_code != Some(country_hint) {
                continue;
            }
        }

        let Some(pos) = object["Point"]["pos"].as_str() else {
            continue;
        };

        let mut parts = pos.split_whitespace();
        let longitude = parts.next().and_then(|p| p.parse::<f64>().ok());
        let latitude = parts.next().and_then(|p| p.parse::<f64>().ok());

        match (longitude, latitude) {
            (Some(longitude), Some(latitude)) => {
                return Some(ResolvedPlace {
                    longitude,
                    latitude,
                    country_code: country_hint.to_string(),
                });
            }
            _ => {
                log::warn!("Malformed position string: {pos:?}");
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(pos: &str, country_code: &str) -> Value {
        json!({
            "GeoObject": {
                "metaDataProperty": {
                    "GeocoderMetaData": {
                        "Address": {"country_code": country_code}
                    }
                },
                "Point": {"pos": pos}
            }
        })
    }

    fn body(features: Vec<Value>) -> Map<String, Value> {
        json!({
            "response": {
                "GeoObjectCollection": {"featureMember": features}
            }
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn unhinted_name_is_normalized_in_one_attempt() {
        let plan = attempt_plan("new-york", "");
        assert_eq!(plan, vec!["new york".to_string()]);
    }

    #[test]
    fn hinted_hyphenated_name_gets_two_attempts() {
        let plan = attempt_plan("rostov-na-donu", "RU");
        assert_eq!(
            plan,
            vec!["rostov-na-donu".to_string(), "rostov na donu".to_string()]
        );
    }

    #[test]
    fn hinted_plain_name_gets_one_attempt() {
        let plan = attempt_plan("berlin", "DE");
        assert_eq!(plan, vec!["berlin".to_string()]);
    }

    #[test]
    fn scan_parses_first_feature() {
        let body = body(vec![feature("37.617698 55.755864", "RU")]);
        let place = scan_features(&body, "").unwrap();
        assert!((place.longitude - 37.617_698).abs() < 1e-6);
        assert!((place.latitude - 55.755_864).abs() < 1e-6);
        assert_eq!(place.country_code, "");
    }

    #[test]
    fn scan_skips_mismatched_country() {
        let body = body(vec![
            feature("13.404954 52.520008", "DE"),
            feature("30.315868 59.939095", "RU"),
        ]);
        let place = scan_features(&body, "RU").unwrap();
        assert!((place.longitude - 30.315_868).abs() < 1e-6);
        assert_eq!(place.country_code, "RU");
    }

    #[test]
    fn scan_of_empty_body_misses() {
        assert!(scan_features(&Map::new(), "").is_none());
        assert!(scan_features(&body(vec![]), "").is_none());
    }

    #[test]
    fn scan_skips_malformed_position() {
        let body = body(vec![
            feature("not-a-position", "RU"),
            feature("30.315868 59.939095", "RU"),
        ]);
        let place = scan_features(&body, "RU").unwrap();
        assert!((place.latitude - 59.939_095).abs() < 1e-6);
    }

    #[test]
    fn sentinel_is_all_zeroes() {
        let sentinel = ResolvedPlace::SENTINEL;
        assert!(sentinel.is_sentinel());
        assert!((sentinel.longitude).abs() < f64::EPSILON);
        assert!((sentinel.latitude).abs() < f64::EPSILON);
        assert!(sentinel.country_code.is_empty());
    }
}
