//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Park command arguments.
#[derive(Debug, Args)]
pub struct ParkCommand {
    /// Latitude of the spot
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the spot
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Attach a photo of the spot
    #[arg(long, value_name = "FILE")]
    pub photo: Option<PathBuf>,

    /// Skip the reverse-geocoding lookup
    #[arg(long)]
    pub no_address: bool,

    /// Skip the best-effort remote push
    #[arg(long)]
    pub no_sync: bool,
}

/// Where command arguments.
#[derive(Debug, Args)]
pub struct WhereCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Maximum number of entries to show
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Fill in missing addresses before listing
    #[arg(long)]
    pub resolve_addresses: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Photo command arguments.
#[derive(Debug, Args)]
pub struct PhotoCommand {
    /// Id of the record to attach the photo to
    pub id: i64,

    /// Path to the photo file
    pub file: PathBuf,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Id of the record to delete
    pub id: i64,
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    /// Skip the confirmation requirement
    #[arg(short, long)]
    pub yes: bool,
}

/// Nearby command arguments.
#[derive(Debug, Args)]
pub struct NearbyCommand {
    /// Latitude to search around
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude to search around
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Search radius in meters (overrides the configured preset)
    #[arg(short, long)]
    pub radius: Option<u32>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Remind command arguments.
#[derive(Debug, Args)]
pub struct RemindCommand {
    /// Wall-clock time for the reminder (HH:MM, today or tomorrow)
    #[arg(long, value_name = "HH:MM")]
    pub at: Option<String>,

    /// Minutes from now
    #[arg(long = "in", value_name = "MINUTES")]
    pub in_minutes: Option<i64>,

    /// Reminder message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Write a calendar event file instead of waiting in the foreground
    #[arg(long, value_name = "FILE")]
    pub ics: Option<PathBuf>,
}

/// Assist command arguments.
#[derive(Debug, Args)]
pub struct AssistCommand {
    /// Ask a single question instead of starting the interactive loop
    #[arg(short, long)]
    pub message: Option<String>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Set the nearby-search radius preset
    Radius {
        /// Radius in meters (500, 1000, 1500 or 2000)
        meters: u32,
    },
}
