//! Command-line interface for parkmark.
//!
//! This module provides the CLI structure and command definitions for the
//! `parkmark` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AssistCommand, ClearCommand, ConfigCommand, DeleteCommand, ListCommand, NearbyCommand,
    ParkCommand, PhotoCommand, RemindCommand, StatusCommand, WhereCommand,
};

/// parkmark - Remember where you parked
///
/// Saves parking spots to a local database, shows them again when you need
/// them, and optionally mirrors them to your own cloud collection.
#[derive(Debug, Parser)]
#[command(name = "parkmark")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save the spot the car is parked at
    Park(ParkCommand),

    /// Show the current spot
    Where(WhereCommand),

    /// List past spots, newest first
    List(ListCommand),

    /// Mark the car as moved
    Depart,

    /// Attach a photo to a saved spot
    Photo(PhotoCommand),

    /// Delete one saved spot
    Delete(DeleteCommand),

    /// Delete the whole history
    Clear(ClearCommand),

    /// Push unsynced spots to the remote collection
    Sync,

    /// Search for parking facilities around a coordinate
    Nearby(NearbyCommand),

    /// Print a shareable message for the current spot
    Share,

    /// Set a reminder alarm or write a calendar event
    Remind(RemindCommand),

    /// Chat with the assistant about the tool
    Assist(AssistCommand),

    /// Show database and sync status
    Status(StatusCommand),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
