//! Reverse geocoding
//!
//! Turns submitted coordinates into the human readable place name stored on
//! the incident. Unlike SMS failures, errors here abort the request.

use crate::config::GeocodingConfig;
use crate::error::{ConfigError, GeocodeError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Coordinates to address lookup
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Formatted address for a latitude/longitude pair
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError>;
}

/// Google Geocoding API client
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

impl GoogleGeocoder {
    /// Build from configuration; the API key is mandatory
    ///
    /// # Errors
    /// - `ConfigError::Invalid` if the key is missing or the client cannot be built
    pub fn new(config: &GeocodingConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ConfigError::Invalid("geocoding.api_key is not set".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("geocoding client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let response: GeocodeResponse = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("latlng", format!("{latitude},{longitude}")),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        first_address(response)
    }
}

fn first_address(response: GeocodeResponse) -> Result<String, GeocodeError> {
    match response.status.as_str() {
        "OK" => response
            .results
            .into_iter()
            .next()
            .map(|r| r.formatted_address)
            .ok_or(GeocodeError::NoResults),
        "ZERO_RESULTS" => Err(GeocodeError::NoResults),
        _ => Err(GeocodeError::Status {
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GeocodeResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn takes_first_formatted_address() {
        let response = parse(json!({
            "status": "OK",
            "results": [
                { "formatted_address": "Alexanderplatz 1, 10178 Berlin, Germany" },
                { "formatted_address": "Berlin, Germany" }
            ]
        }));
        assert_eq!(
            first_address(response).unwrap(),
            "Alexanderplatz 1, 10178 Berlin, Germany"
        );
    }

    #[test]
    fn zero_results_is_no_results() {
        let response = parse(json!({ "status": "ZERO_RESULTS", "results": [] }));
        assert!(matches!(first_address(response), Err(GeocodeError::NoResults)));
    }

    #[test]
    fn quota_errors_keep_provider_message() {
        let response = parse(json!({
            "status": "OVER_QUERY_LIMIT",
            "error_message": "You have exceeded your daily request quota"
        }));
        let err = first_address(response).unwrap_err();
        assert!(err.to_string().contains("OVER_QUERY_LIMIT"));
    }
}
