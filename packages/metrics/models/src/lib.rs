#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types for the reporting API's statistics payload.
//!
//! Every metric case returns the same envelope: a `data` list of records,
//! each carrying an ordered `dimensions` list and an ordered `metrics`
//! list. The accessors here are what the row-upsert layer uses to pick
//! the pieces apart; anything missing or malformed surfaces as a
//! [`RecordError`] so the worker's guard can roll the day back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while picking apart a reporting-API record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The `data` list exists but does not deserialize to records.
    #[error("Malformed data list: {0}")]
    MalformedData(#[from] serde_json::Error),

    /// A record carried no dimensions.
    #[error("Record has no dimensions")]
    MissingDimension,

    /// A record carried no metric values.
    #[error("Record has no metrics")]
    MissingMetric,

    /// A dimension field the case requires was absent.
    #[error("Dimension is missing field `{field}`")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },

    /// A dimension value did not have the shape the case expects.
    #[error("Unexpected dimension value: {value:?}")]
    UnexpectedValue {
        /// The offending value.
        value: String,
    },
}

/// One value of one dimension, as the reporting API serializes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionValue {
    /// External identifier (e.g., the API's city id or device id).
    #[serde(default)]
    pub id: Option<String>,
    /// Human-readable display name.
    #[serde(default)]
    pub name: Option<String>,
    /// ISO region name, present on geographic dimensions only.
    #[serde(default)]
    pub iso_name: Option<String>,
}

impl DimensionValue {
    /// Returns the external id, erroring if the API omitted it.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingField`] if `id` is absent.
    pub fn id(&self) -> Result<&str, RecordError> {
        self.id
            .as_deref()
            .ok_or(RecordError::MissingField { field: "id" })
    }

    /// Returns the display name, erroring if the API omitted it.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingField`] if `name` is absent.
    pub fn name(&self) -> Result<&str, RecordError> {
        self.name
            .as_deref()
            .ok_or(RecordError::MissingField { field: "name" })
    }

    /// Parses the external id as a number (city ids are numeric strings).
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if `id` is absent or not numeric.
    pub fn numeric_id(&self) -> Result<i64, RecordError> {
        let raw = self.id()?;
        raw.parse()
            .map_err(|_| RecordError::UnexpectedValue { value: raw.into() })
    }

    /// Extracts the `HH:MM:SS` part from an hourly dimension name.
    ///
    /// Hourly names arrive as `"Hour 14:00:00"`; the persisted hour key
    /// is the token after the first space.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if `name` is absent or has no second token.
    pub fn hour_name(&self) -> Result<&str, RecordError> {
        let name = self.name()?;
        name.split(' ')
            .nth(1)
            .ok_or_else(|| RecordError::UnexpectedValue { value: name.into() })
    }

    /// Derives a two-letter country hint from the ISO region name.
    ///
    /// Returns an empty string when the record carries no `iso_name`
    /// (the geocoder treats an empty hint as "no filter").
    #[must_use]
    pub fn country_hint(&self) -> &str {
        self.iso_name
            .as_deref()
            .map_or("", |iso| iso.get(..2).unwrap_or(""))
    }
}

/// One record of the reporting API's `data` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Ordered dimension values; the first one identifies the entity.
    #[serde(default)]
    pub dimensions: Vec<DimensionValue>,
    /// Ordered metric values; the first one is the measured quantity.
    #[serde(default)]
    pub metrics: Vec<f64>,
}

impl MetricRecord {
    /// Deserializes the `data` list out of a validated response body.
    ///
    /// An absent `data` field means "nothing to process" and yields an
    /// empty list; a present but malformed list is an error (the worker
    /// rolls the day back rather than persist a partial batch).
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MalformedData`] if `data` exists but does
    /// not deserialize to a record list.
    pub fn list_from_body(body: &Map<String, Value>) -> Result<Vec<Self>, RecordError> {
        match body.get("data") {
            None => Ok(Vec::new()),
            Some(data) => Ok(serde_json::from_value(data.clone())?),
        }
    }

    /// Returns the record's first dimension value.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingDimension`] if the list is empty.
    pub fn primary_dimension(&self) -> Result<&DimensionValue, RecordError> {
        self.dimensions.first().ok_or(RecordError::MissingDimension)
    }

    /// Returns the record's first metric value, truncated to an integer
    /// (the API reports whole counts as floats).
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingMetric`] if the list is empty.
    #[allow(clippy::cast_possible_truncation)]
    pub fn primary_metric(&self) -> Result<i64, RecordError> {
        self.metrics
            .first()
            .map(|v| *v as i64)
            .ok_or(RecordError::MissingMetric)
    }
}
