//! Reverse geocoding for parkmark.
//!
//! Turns a record's coordinates into a human-readable address after the
//! fact. Lookups are best effort: a failed lookup leaves the address empty
//! and is retried the next time addresses are refreshed.

use std::time::Duration;

use tracing::{debug, warn};
use ureq::Agent;

use crate::config::GeocodeConfig;
use crate::error::{Error, Result};
use crate::storage::RecordStore;

/// Per-lookup timeout.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a Nominatim-style reverse-geocoding endpoint.
#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    agent: Agent,
    url: String,
}

impl ReverseGeocoder {
    /// Build a geocoder from its configuration section.
    #[must_use]
    pub fn from_config(config: &GeocodeConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(LOOKUP_TIMEOUT))
            .build()
            .new_agent();
        Self {
            agent,
            url: config.reverse_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up the address for a coordinate pair.
    ///
    /// Returns `Ok(None)` when the endpoint has no address for the spot.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// response that isn't the expected JSON shape.
    pub fn lookup(&self, latitude: f64, longitude: f64) -> Result<Option<String>> {
        let url = format!(
            "{}?format=jsonv2&lat={latitude}&lon={longitude}",
            self.url
        );
        debug!("Reverse geocoding via {}", url);

        let mut response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(Error::RemoteStatus {
                    endpoint: "geocode",
                    status: code,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = response
            .body_mut()
            .read_json()
            .map_err(|e| Error::remote_format("geocode", e.to_string()))?;

        Ok(value
            .get("display_name")
            .and_then(serde_json::Value::as_str)
            .map(String::from))
    }
}

/// Fill in addresses for every stored record that lacks one.
///
/// Lookup failures are logged and skipped; the record keeps an empty address
/// for a later attempt. Returns how many addresses were written.
///
/// # Errors
///
/// Returns an error only if reading or updating the store fails.
pub fn fill_missing(store: &dyn RecordStore, geocoder: &ReverseGeocoder) -> Result<usize> {
    let mut filled = 0;
    for record in store.list_all()? {
        if record.address.is_some() {
            continue;
        }
        let Some(id) = record.id else { continue };

        match geocoder.lookup(record.latitude, record.longitude) {
            Ok(Some(address)) => {
                store.set_address(id, &address)?;
                filled += 1;
            }
            Ok(None) => debug!("No address known for record {}", id),
            Err(e) => warn!("Address lookup for record {} failed: {}", id, e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ParkingRecord;
    use crate::storage::Storage;
    use crate::testsupport::OneShotServer;

    fn geocoder_for(url: &str) -> ReverseGeocoder {
        ReverseGeocoder::from_config(&GeocodeConfig {
            enabled: true,
            reverse_url: url.to_string(),
        })
    }

    #[test]
    fn test_lookup_parses_display_name() {
        let server = OneShotServer::respond(
            200,
            r#"{"display_name":"Plaza de los Luceros, Alicante, Spain","lat":"38.34"}"#,
        );
        let geocoder = geocoder_for(&server.url());

        let address = geocoder.lookup(38.34, -0.48).unwrap();
        assert_eq!(
            address.as_deref(),
            Some("Plaza de los Luceros, Alicante, Spain")
        );

        let request = server.into_request();
        assert!(request.contains("format=jsonv2"));
        assert!(request.contains("lat=38.34"));
        assert!(request.contains("lon=-0.48"));
    }

    #[test]
    fn test_lookup_without_display_name() {
        let server = OneShotServer::respond(200, r#"{"error":"Unable to geocode"}"#);
        let geocoder = geocoder_for(&server.url());

        let address = geocoder.lookup(0.0, 0.0).unwrap();
        assert!(address.is_none());
    }

    #[test]
    fn test_lookup_malformed_response() {
        let server = OneShotServer::respond(200, "not json at all");
        let geocoder = geocoder_for(&server.url());

        let err = geocoder.lookup(0.0, 0.0).unwrap_err();
        assert!(matches!(err, Error::RemoteFormat { .. }));
    }

    #[test]
    fn test_lookup_server_error() {
        let server = OneShotServer::respond(503, "{}");
        let geocoder = geocoder_for(&server.url());

        let err = geocoder.lookup(0.0, 0.0).unwrap_err();
        match err {
            Error::RemoteStatus { status, .. } => assert_eq!(status, 503),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fill_missing_updates_only_blank_addresses() {
        let storage = Storage::open_in_memory().unwrap();

        let mut with_address = ParkingRecord::at(1.0, 2.0);
        with_address.address = Some("Known street".to_string());
        storage.insert(&with_address).unwrap();
        let blank_id = storage.insert(&ParkingRecord::at(38.34, -0.48)).unwrap();

        let server = OneShotServer::respond(200, r#"{"display_name":"Filled street"}"#);
        let geocoder = geocoder_for(&server.url());

        let filled = fill_missing(&storage, &geocoder).unwrap();
        assert_eq!(filled, 1);

        let record = storage.get(blank_id).unwrap().unwrap();
        assert_eq!(record.address.as_deref(), Some("Filled street"));
    }

    #[test]
    fn test_fill_missing_survives_lookup_failure() {
        let storage = Storage::open_in_memory().unwrap();
        storage.insert(&ParkingRecord::at(1.0, 2.0)).unwrap();

        // No server behind this port.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let geocoder = geocoder_for(&format!("http://{addr}"));
        let filled = fill_missing(&storage, &geocoder).unwrap();
        assert_eq!(filled, 0);
    }
}
