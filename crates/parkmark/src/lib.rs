//! `parkmark` - Remember where you parked
//!
//! This library provides the core functionality for recording parking spots
//! in a local database, finding and sharing them again, and mirroring them
//! to a remote document collection on a best-effort basis.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod alarm;
pub mod assist;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod geocode;
pub mod logging;
pub mod places;
pub mod record;
pub mod storage;
pub mod sync;

#[cfg(test)]
pub(crate) mod testsupport;

pub use config::Config;
pub use connectivity::ConnectivityProbe;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::ParkingRecord;
pub use storage::{RecordStore, Storage, StoreStats};
pub use sync::SyncClient;
