//! Nearby parking search for parkmark.
//!
//! Queries a places endpoint for parking facilities around a coordinate and
//! parses the result list. The endpoint and API key come from the `search`
//! configuration section, the radius from the persisted preference.

use std::time::Duration;

use tracing::debug;
use ureq::Agent;

use crate::config::SearchConfig;
use crate::error::{Error, Result};

/// Per-search timeout.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

/// One parking facility returned by the search.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NearbySpot {
    /// Display name of the facility.
    pub name: String,
    /// Latitude of the facility.
    pub latitude: f64,
    /// Longitude of the facility.
    pub longitude: f64,
    /// Short address or neighborhood, when the endpoint provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vicinity: Option<String>,
}

/// Client for the places-search endpoint.
#[derive(Debug, Clone)]
pub struct PlacesClient {
    agent: Agent,
    url: String,
    api_key: String,
}

impl PlacesClient {
    /// Build a client from the search configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(Error::MissingApiKey { endpoint: "places" })?;

        let agent = Agent::config_builder()
            .timeout_global(Some(SEARCH_TIMEOUT))
            .build()
            .new_agent();

        Ok(Self {
            agent,
            url: config.places_url.clone(),
            api_key,
        })
    }

    /// Search for parking facilities within `radius_meters` of a coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// response that doesn't match the expected shape.
    pub fn nearby_parking(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: u32,
    ) -> Result<Vec<NearbySpot>> {
        let url = format!(
            "{}?location={latitude},{longitude}&radius={radius_meters}&type=parking&key={}",
            self.url, self.api_key
        );
        debug!("Searching parking within {}m", radius_meters);

        let mut response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(Error::RemoteStatus {
                    endpoint: "places",
                    status: code,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = response
            .body_mut()
            .read_json()
            .map_err(|e| Error::remote_format("places", e.to_string()))?;

        parse_results(&value)
    }
}

/// Extract the spots from a places response body.
fn parse_results(value: &serde_json::Value) -> Result<Vec<NearbySpot>> {
    let results = value
        .get("results")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| Error::remote_format("places", "missing results array"))?;

    let mut spots = Vec::with_capacity(results.len());
    for result in results {
        let name = result
            .get("name")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| Error::remote_format("places", "result without name"))?;
        let location = result
            .get("geometry")
            .and_then(|g| g.get("location"))
            .ok_or_else(|| Error::remote_format("places", "result without location"))?;
        let latitude = location
            .get("lat")
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| Error::remote_format("places", "location without lat"))?;
        let longitude = location
            .get("lng")
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| Error::remote_format("places", "location without lng"))?;
        let vicinity = result
            .get("vicinity")
            .and_then(serde_json::Value::as_str)
            .map(String::from);

        spots.push(NearbySpot {
            name: name.to_string(),
            latitude,
            longitude,
            vicinity,
        });
    }
    Ok(spots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::OneShotServer;

    fn client_for(url: &str) -> PlacesClient {
        PlacesClient::from_config(&SearchConfig {
            radius_meters: 1000,
            places_url: url.to_string(),
            api_key: Some("test-key".to_string()),
        })
        .unwrap()
    }

    const RESPONSE: &str = r#"{
        "results": [
            {
                "name": "Parking Central",
                "vicinity": "Avenida de la Estación",
                "geometry": {"location": {"lat": 38.345, "lng": -0.49}}
            },
            {
                "name": "Parking Mercado",
                "geometry": {"location": {"lat": 38.35, "lng": -0.484}}
            }
        ],
        "status": "OK"
    }"#;

    #[test]
    fn test_from_config_requires_api_key() {
        let result = PlacesClient::from_config(&SearchConfig::default());
        assert!(matches!(result, Err(Error::MissingApiKey { .. })));
    }

    #[test]
    fn test_nearby_parking_parses_results() {
        let server = OneShotServer::respond(200, RESPONSE);
        let client = client_for(&server.url());

        let spots = client.nearby_parking(38.34, -0.48, 1500).unwrap();
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[0].name, "Parking Central");
        assert!((spots[0].latitude - 38.345).abs() < f64::EPSILON);
        assert_eq!(spots[0].vicinity.as_deref(), Some("Avenida de la Estación"));
        assert!(spots[1].vicinity.is_none());

        let request = server.into_request();
        assert!(request.contains("location=38.34,-0.48"));
        assert!(request.contains("radius=1500"));
        assert!(request.contains("type=parking"));
        assert!(request.contains("key=test-key"));
    }

    #[test]
    fn test_nearby_parking_empty_results() {
        let server = OneShotServer::respond(200, r#"{"results": [], "status": "ZERO_RESULTS"}"#);
        let client = client_for(&server.url());

        let spots = client.nearby_parking(0.0, 0.0, 500).unwrap();
        assert!(spots.is_empty());
    }

    #[test]
    fn test_nearby_parking_missing_results_array() {
        let server = OneShotServer::respond(200, r#"{"status": "REQUEST_DENIED"}"#);
        let client = client_for(&server.url());

        let err = client.nearby_parking(0.0, 0.0, 500).unwrap_err();
        assert!(matches!(err, Error::RemoteFormat { .. }));
        assert!(err.to_string().contains("could not process results"));
    }

    #[test]
    fn test_nearby_parking_malformed_json() {
        let server = OneShotServer::respond(200, "<html>not json</html>");
        let client = client_for(&server.url());

        let err = client.nearby_parking(0.0, 0.0, 500).unwrap_err();
        assert!(matches!(err, Error::RemoteFormat { .. }));
    }

    #[test]
    fn test_nearby_parking_server_error() {
        let server = OneShotServer::respond(500, "{}");
        let client = client_for(&server.url());

        let err = client.nearby_parking(0.0, 0.0, 500).unwrap_err();
        assert!(matches!(err, Error::RemoteStatus { status: 500, .. }));
    }

    #[test]
    fn test_parse_results_result_without_name() {
        let value: serde_json::Value = serde_json::from_str(
            r#"{"results": [{"geometry": {"location": {"lat": 1.0, "lng": 2.0}}}]}"#,
        )
        .unwrap();
        assert!(parse_results(&value).is_err());
    }
}
