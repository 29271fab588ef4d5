//! `parkmark` - CLI for the parking-spot recorder
//!
//! This binary provides the command-line interface: saving spots, finding
//! them again, syncing them, and the assorted helpers around them.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{BufRead, Write};
use std::sync::mpsc;

use anyhow::Context;
use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use tracing::{info, warn};

use parkmark::alarm::{self, Alarm, CalendarEvent};
use parkmark::assist::{ChatSession, GREETING};
use parkmark::cli::{
    AssistCommand, ClearCommand, Cli, Command, ConfigCommand, DeleteCommand, ListCommand,
    NearbyCommand, ParkCommand, PhotoCommand, RemindCommand, WhereCommand,
};
use parkmark::connectivity::ConnectivityProbe;
use parkmark::geocode::{self, ReverseGeocoder};
use parkmark::places::PlacesClient;
use parkmark::record::ParkingRecord;
use parkmark::storage::{RecordStore, Storage};
use parkmark::sync::SyncClient;
use parkmark::{init_logging, Config};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config_path = cli.config.clone();
    let config = Config::load_from(config_path.clone())?;

    match cli.command {
        Command::Park(cmd) => {
            let storage = open_store(&config)?;
            handle_park(&storage, &config, cmd)
        }
        Command::Where(cmd) => {
            let storage = open_store(&config)?;
            handle_where(&storage, &cmd)
        }
        Command::List(cmd) => {
            let storage = open_store(&config)?;
            handle_list(&storage, &config, &cmd)
        }
        Command::Depart => {
            let storage = open_store(&config)?;
            handle_depart(&storage)
        }
        Command::Photo(cmd) => {
            let storage = open_store(&config)?;
            handle_photo(&storage, &cmd)
        }
        Command::Delete(cmd) => {
            let storage = open_store(&config)?;
            handle_delete(&storage, &cmd)
        }
        Command::Clear(cmd) => {
            let storage = open_store(&config)?;
            handle_clear(&storage, &cmd)
        }
        Command::Sync => {
            let storage = open_store(&config)?;
            handle_sync(&storage, &config)
        }
        Command::Nearby(cmd) => handle_nearby(&config, &cmd),
        Command::Share => {
            let storage = open_store(&config)?;
            handle_share(&storage)
        }
        Command::Remind(cmd) => {
            let storage = open_store(&config)?;
            handle_remind(&storage, cmd)
        }
        Command::Assist(cmd) => handle_assist(&config, &cmd),
        Command::Status(cmd) => {
            let storage = open_store(&config)?;
            handle_status(&storage, &config, cmd.json)
        }
        Command::Config(cmd) => handle_config(&config, config_path, cmd),
    }
}

/// Open the one configured record store.
fn open_store(config: &Config) -> anyhow::Result<Storage> {
    Storage::open(config.database_path()).context("could not open the local database")
}

fn handle_park(store: &dyn RecordStore, config: &Config, cmd: ParkCommand) -> anyhow::Result<()> {
    let mut record = ParkingRecord::at(cmd.lat, cmd.lon);
    record.photo_path = cmd.photo.map(|p| p.display().to_string());

    if !cmd.no_address && config.geocode.enabled {
        let geocoder = ReverseGeocoder::from_config(&config.geocode);
        match geocoder.lookup(record.latitude, record.longitude) {
            Ok(found) => record.address = found,
            Err(e) => warn!("Address lookup failed: {}", e),
        }
    }

    let id = store.insert(&record).context("could not save the spot")?;
    store.mark_current(id)?;

    println!(
        "Saved spot #{id} at {}, {} ({} {}).",
        record.latitude, record.longitude, record.date, record.time
    );
    if let Some(address) = &record.address {
        println!("Address: {address}");
    }

    if !cmd.no_sync && config.sync.enabled {
        push_one(store, config, id);
    }

    Ok(())
}

/// Best-effort push of a single freshly saved record.
///
/// Failures only defer the record to the next `sync` run.
fn push_one(store: &dyn RecordStore, config: &Config, id: i64) {
    let probe = ConnectivityProbe::new(&config.connectivity);
    if !probe.is_online() {
        info!("Offline; spot {} will sync later", id);
        return;
    }

    let client = match SyncClient::from_config(&config.sync) {
        Ok(client) => client,
        Err(e) => {
            warn!("Sync not attempted: {}", e);
            return;
        }
    };

    let Ok(Some(saved)) = store.get(id) else {
        return;
    };

    let (tx, rx) = mpsc::channel();
    let tx_err = tx.clone();
    let handle = client.push_detached(
        saved,
        move || {
            let _ = tx.send(true);
        },
        move |_| {
            let _ = tx_err.send(false);
        },
    );
    let _ = handle.join();

    if rx.recv() == Ok(true) {
        if let Err(e) = store.set_synced(id, true) {
            warn!("Could not mark spot {} synced: {}", id, e);
        } else {
            println!("Spot pushed to the remote collection.");
        }
    } else {
        println!("Could not push the spot; it will be retried on the next sync.");
    }
}

fn handle_where(store: &dyn RecordStore, cmd: &WhereCommand) -> anyhow::Result<()> {
    let Some(record) = store.current()? else {
        println!("No spot is marked as current.");
        return Ok(());
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
        println!("Map:      {}", record.map_link());
    }
    Ok(())
}

fn handle_list(store: &dyn RecordStore, config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    if cmd.resolve_addresses {
        let geocoder = ReverseGeocoder::from_config(&config.geocode);
        let filled = geocode::fill_missing(store, &geocoder)?;
        if filled > 0 {
            info!("Filled {} missing addresses", filled);
        }
    }

    // Newest first for display.
    let mut records = store.list_all()?;
    records.reverse();
    if let Some(limit) = cmd.limit {
        records.truncate(limit);
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No spots saved yet.");
        return Ok(());
    }
    for record in &records {
        print_record_line(record);
    }
    Ok(())
}

fn handle_depart(store: &dyn RecordStore) -> anyhow::Result<()> {
    let Some(record) = store.current()? else {
        println!("No spot is marked as current.");
        return Ok(());
    };
    let Some(id) = record.id else {
        println!("No spot is marked as current.");
        return Ok(());
    };

    let stamp = ParkingRecord::departure_stamp_now();
    store.set_current_state(id, false, Some(&stamp))?;
    println!("Departure recorded for spot #{id} at {stamp}.");
    Ok(())
}

fn handle_photo(store: &dyn RecordStore, cmd: &PhotoCommand) -> anyhow::Result<()> {
    if !cmd.file.exists() {
        println!("Photo file {} does not exist.", cmd.file.display());
        return Ok(());
    }

    let affected = store.update_photo(cmd.id, &cmd.file.display().to_string())?;
    if affected == 0 {
        println!("No spot with id {}.", cmd.id);
    } else {
        println!("Photo attached to spot #{}.", cmd.id);
    }
    Ok(())
}

fn handle_delete(store: &dyn RecordStore, cmd: &DeleteCommand) -> anyhow::Result<()> {
    let affected = store.delete_one(cmd.id)?;
    if affected == 0 {
        println!("No spot with id {}.", cmd.id);
    } else {
        println!("Spot #{} deleted.", cmd.id);
    }
    Ok(())
}

fn handle_clear(store: &dyn RecordStore, cmd: &ClearCommand) -> anyhow::Result<()> {
    if !cmd.yes {
        println!("This deletes the whole parking history and cannot be undone.");
        println!("Run again with --yes to confirm.");
        return Ok(());
    }

    let deleted = store.delete_all()?;
    println!("History cleared ({deleted} spots removed).");
    Ok(())
}

fn handle_sync(store: &dyn RecordStore, config: &Config) -> anyhow::Result<()> {
    if !config.sync.enabled {
        println!("Sync is disabled; enable it in the configuration file.");
        return Ok(());
    }

    let probe = ConnectivityProbe::new(&config.connectivity);
    if !probe.is_online() {
        println!("Network unavailable; nothing pushed.");
        return Ok(());
    }

    let client = SyncClient::from_config(&config.sync)?;
    let pending = store.list_pending()?;
    if pending.is_empty() {
        println!("Nothing to push.");
        return Ok(());
    }

    let total = pending.len();
    let outcomes = client.push_all(pending);

    let mut pushed = 0;
    for outcome in outcomes {
        match (outcome.id, outcome.result) {
            (Some(id), Ok(())) => {
                store.set_synced(id, true)?;
                pushed += 1;
            }
            (id, Err(e)) => warn!("Push of record {:?} failed: {}", id, e),
            _ => {}
        }
    }

    println!("Pushed {pushed} of {total} pending spots.");
    if pushed < total {
        println!("The rest will be retried on the next sync.");
    }
    Ok(())
}

fn handle_nearby(config: &Config, cmd: &NearbyCommand) -> anyhow::Result<()> {
    let radius = cmd.radius.unwrap_or(config.search.radius_meters);
    let client = PlacesClient::from_config(&config.search)?;

    let spots = client
        .nearby_parking(cmd.lat, cmd.lon, radius)
        .context("could not search for nearby parking")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&spots)?);
        return Ok(());
    }

    if spots.is_empty() {
        println!("No parking found within {radius} meters.");
        return Ok(());
    }

    println!("Parking within {radius} meters:");
    for spot in &spots {
        match &spot.vicinity {
            Some(vicinity) => println!(
                "  {} ({}, {}) - {}",
                spot.name, spot.latitude, spot.longitude, vicinity
            ),
            None => println!("  {} ({}, {})", spot.name, spot.latitude, spot.longitude),
        }
    }
    Ok(())
}

fn handle_share(store: &dyn RecordStore) -> anyhow::Result<()> {
    match store.current()? {
        Some(record) => println!("{}", record.share_message()),
        None => println!("No spot saved to share."),
    }
    Ok(())
}

fn handle_remind(store: &dyn RecordStore, cmd: RemindCommand) -> anyhow::Result<()> {
    let deadline = alarm::resolve_deadline(cmd.at.as_deref(), cmd.in_minutes)?;
    let message = cmd
        .message
        .unwrap_or_else(|| "Time to move the car".to_string());

    if let Some(ics_path) = cmd.ics {
        let location = store.current()?.map_or_else(String::new, |record| {
            record.address.unwrap_or_else(|| {
                format!("{}, {}", record.latitude, record.longitude)
            })
        });

        let start = deadline.with_timezone(&Utc);
        let event = CalendarEvent {
            summary: message,
            location,
            description: "parkmark reminder".to_string(),
            start,
            end: start + ChronoDuration::hours(1),
        };
        event.write_ics(&ics_path)?;
        println!("Calendar event written to {}.", ics_path.display());
        return Ok(());
    }

    println!(
        "Reminder set for {}. Waiting; press Ctrl-C to cancel.",
        deadline.format("%d/%m/%Y %H:%M")
    );
    let alarm = Alarm::schedule(deadline, move || {
        // Terminal bell plus the message.
        println!("\x07\x07{message}");
    })?;
    if !alarm.wait() {
        println!("Reminder cancelled.");
    }
    Ok(())
}

fn handle_assist(config: &Config, cmd: &AssistCommand) -> anyhow::Result<()> {
    let mut session = ChatSession::new(&config.assist)?;

    if let Some(message) = &cmd.message {
        let reply = session
            .send(message)
            .context("the assistant is unavailable")?;
        println!("{reply}");
        return Ok(());
    }

    println!("{GREETING}");
    println!("(empty line or 'exit' to quit)");
    let stdin = std::io::stdin();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() || message == "exit" || message == "quit" {
            break;
        }

        match session.send(message) {
            Ok(reply) => println!("{reply}"),
            Err(e) => println!("(no reply: {e})"),
        }
    }
    Ok(())
}

fn handle_status(store: &dyn RecordStore, config: &Config, json: bool) -> anyhow::Result<()> {
    let stats = store.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "total_spots": stats.total_records,
            "pending_spots": stats.pending_records,
            "current_spot_id": stats.current_id,
            "db_size_bytes": stats.db_size_bytes,
            "sync_enabled": config.sync.enabled,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("parkmark status");
        println!("---------------");
        println!("Database:      {}", config.database_path().display());
        println!("Spots:         {}", stats.total_records);
        println!("Pending sync:  {}", stats.pending_records);
        match stats.current_id {
            Some(id) => println!("Current spot:  #{id}"),
            None => println!("Current spot:  none"),
        }
        println!(
            "Sync:          {}",
            if config.sync.enabled { "enabled" } else { "disabled" }
        );
    }
    Ok(())
}

fn handle_config(
    config: &Config,
    config_path: Option<std::path::PathBuf>,
    cmd: ConfigCommand,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:   {}", config.database_path().display());
                println!();
                println!("[Search]");
                println!("  Radius (m):      {}", config.search.radius_meters);
                println!(
                    "  API key set:     {}",
                    config.search.api_key.is_some()
                );
                println!();
                println!("[Sync]");
                println!("  Enabled:         {}", config.sync.enabled);
                println!(
                    "  Base URL:        {}",
                    config.sync.base_url.as_deref().unwrap_or("(not set)")
                );
                println!("  Collection:      {}", config.sync.collection);
                println!();
                println!("[Geocode]");
                println!("  Enabled:         {}", config.geocode.enabled);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
        ConfigCommand::Radius { meters } => {
            let mut updated = config.clone();
            updated.search.radius_meters = meters;
            updated.validate()?;

            let path = config_path.unwrap_or_else(Config::default_config_path);
            updated.store_to(&path)?;
            println!("Search radius saved: {meters} meters.");
        }
    }
    Ok(())
}

/// One-line summary used by the list view.
fn print_record_line(record: &ParkingRecord) {
    let id = record.id.unwrap_or_default();
    let mut flags = String::new();
    if record.is_current {
        flags.push_str(" [current]");
    }
    if record.synced {
        flags.push_str(" [synced]");
    }

    println!(
        "#{id}  {} {}  {}, {}{flags}",
        record.date, record.time, record.latitude, record.longitude
    );
    if let Some(address) = &record.address {
        println!("     {address}");
    }
    if let Some(departure) = &record.departure {
        println!("     departed {departure}");
    }
}

/// Detail view used by the `where` command.
fn print_record(record: &ParkingRecord) {
    println!("Spot:     #{}", record.id.unwrap_or_default());
    println!("Position: {}, {}", record.latitude, record.longitude);
    println!("Saved:    {} {}", record.date, record.time);
    println!(
        "Address:  {}",
        record.address.as_deref().unwrap_or("not available")
    );
    if let Some(photo) = &record.photo_path {
        println!("Photo:    {photo}");
    }
    if let Some(departure) = &record.departure {
        println!("Departed: {departure}");
    }
}
