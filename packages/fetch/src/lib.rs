#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Checked HTTP GET wrapper shared by the reporting and geocoding clients.
//!
//! Every upstream call goes through [`get_json`], which collapses the
//! HTTP/JSON failure modes into one contract: callers receive either a
//! populated JSON object or an explicitly empty one, never an error, for
//! anything that happened at the protocol layer. A non-200 status, an
//! unparsable body, and an application-level `errors` field inside a 200
//! are all logged and recovered as the empty object ("nothing to
//! process"). Only transport-level send failures (DNS, refused
//! connection, timeout) surface as [`FetchError`] — those are the
//! unexpected-exception class the ingestion worker's guard handles.

use serde_json::{Map, Value};
use thiserror::Error;

/// Timeout applied to every request. The ingestion core itself has no
/// intrinsic timeout, so one is imposed here at the network boundary.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors from the fetch layer.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Builds the shared HTTP client with the boundary timeout applied.
///
/// # Errors
///
/// Returns [`FetchError`] if the TLS backend fails to initialize.
pub fn client() -> Result<reqwest::Client, FetchError> {
    Ok(reqwest::Client::builder()
        .user_agent("traffic-map/0.1")
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

/// Issues a GET and validates the response.
///
/// Returns the parsed body on a clean 200, or the empty object for any
/// recovered failure mode (see [`validate`]).
///
/// # Errors
///
/// Returns [`FetchError`] only if the request could not be sent or the
/// body could not be read off the wire.
pub async fn get_json(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
    headers: &[(&str, &str)],
) -> Result<Map<String, Value>, FetchError> {
    let mut request = client.get(url).query(query);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    Ok(validate(status, &body))
}

/// Collapses a status/body pair into the populated-or-empty contract.
///
/// - 200 with a parseable JSON object and no `errors` field: the object.
/// - 200 with an `errors` field: the error message is logged, empty.
/// - 200 with an unparsable or non-object body: logged, empty.
/// - Any other status: logged, empty.
#[must_use]
pub fn validate(status: reqwest::StatusCode, body: &str) -> Map<String, Value> {
    if status != reqwest::StatusCode::OK {
        log::warn!("Status code: {status}");
        return Map::new();
    }

    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Unparsable response body: {e}");
            return Map::new();
        }
    };

    let Value::Object(object) = parsed else {
        log::warn!("Response body is not a JSON object");
        return Map::new();
    };

    if let Some(errors) = object.get("errors") {
        let message = errors["message"].as_str().unwrap_or("unknown error");
        log::warn!("API error: {message}");
        return Map::new();
    }

    object
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn ok_body_passes_through() {
        let body = json!({"data": [{"metrics": [1.0]}]}).to_string();
        let result = validate(StatusCode::OK, &body);
        assert!(result.contains_key("data"));
    }

    #[test]
    fn non_200_is_empty() {
        let body = json!({"data": []}).to_string();
        assert!(validate(StatusCode::FORBIDDEN, &body).is_empty());
        assert!(validate(StatusCode::INTERNAL_SERVER_ERROR, &body).is_empty());
    }

    #[test]
    fn errors_field_is_empty() {
        let body = json!({"errors": {"message": "quota exceeded"}}).to_string();
        assert!(validate(StatusCode::OK, &body).is_empty());
    }

    #[test]
    fn unparsable_body_is_empty() {
        assert!(validate(StatusCode::OK, "<html>upstream broke</html>").is_empty());
    }

    #[test]
    fn non_object_body_is_empty() {
        assert!(validate(StatusCode::OK, "[1, 2, 3]").is_empty());
    }
}
