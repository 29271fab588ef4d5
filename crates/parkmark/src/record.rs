//! Core record type for parkmark.
//!
//! This module defines the fundamental data structure representing a single
//! parked-vehicle location and the helpers that format it for humans.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Date format used for the `date` field.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Time format used for the `time` field.
pub const TIME_FORMAT: &str = "%H:%M";

/// Combined format used for departure stamps.
pub const STAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// A single parking-location entry.
///
/// Records where the vehicle was left, when, and the bookkeeping flags the
/// store maintains: whether this is the spot the car is presently parked at,
/// and whether the record has been mirrored to the remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingRecord {
    /// Unique identifier (assigned by the storage layer on insert).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Latitude of the parked vehicle.
    pub latitude: f64,

    /// Longitude of the parked vehicle.
    pub longitude: f64,

    /// Day the record was created (`dd/MM/yyyy`).
    pub date: String,

    /// Time of day the record was created (`HH:mm`).
    pub time: String,

    /// Reverse-geocoded street address, filled in after creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Path to a locally stored photo of the spot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,

    /// Whether this record marks where the car is parked right now.
    ///
    /// The store guarantees at most one record carries this flag.
    #[serde(default)]
    pub is_current: bool,

    /// Stamp set when the user marks the vehicle as moved (`dd/MM/yyyy HH:mm`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure: Option<String>,

    /// Whether this record has been pushed to the remote collection.
    #[serde(default)]
    pub synced: bool,
}

impl ParkingRecord {
    /// Create a new, unsaved record at the given coordinates.
    ///
    /// Stamps the record with the local date and time.
    #[must_use]
    pub fn at(latitude: f64, longitude: f64) -> Self {
        let now = Local::now();
        Self {
            id: None,
            latitude,
            longitude,
            date: now.format(DATE_FORMAT).to_string(),
            time: now.format(TIME_FORMAT).to_string(),
            address: None,
            photo_path: None,
            is_current: false,
            departure: None,
            synced: false,
        }
    }

    /// A departure stamp for "now", in the record's stamp format.
    #[must_use]
    pub fn departure_stamp_now() -> String {
        Local::now().format(STAMP_FORMAT).to_string()
    }

    /// An OpenStreetMap link pointing at the record's coordinates.
    #[must_use]
    pub fn map_link(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={}&mlon={}#map=17/{}/{}",
            self.latitude, self.longitude, self.latitude, self.longitude
        )
    }

    /// Text suitable for sharing the spot with someone else.
    #[must_use]
    pub fn share_message(&self) -> String {
        format!(
            "Look where I parked!\n\n\
             Address: {}\n\
             Latitude: {}, Longitude: {}\n\
             Date: {}, Time: {}\n\n\
             {}",
            self.address.as_deref().unwrap_or("address not available"),
            self.latitude,
            self.longitude,
            self.date,
            self.time,
            self.map_link()
        )
    }

    /// Check whether a photo is attached.
    #[must_use]
    pub fn has_photo(&self) -> bool {
        self.photo_path.is_some()
    }
}
