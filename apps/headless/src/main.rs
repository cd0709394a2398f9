//! Headless tour guide.
//!
//! Reads positions and commands from stdin, drives the guide runtime, and
//! logs every event the presentation layer would receive.

mod channel;
mod command;

use anyhow::Context;
use channel::SimulatedChannel;
use command::{Command, HELP};
use futures::StreamExt;
use geoguide_application::{
    walk_route, GuideConfig, GuideEngine, GuideHandle, GuideRuntime, GuideSnapshot,
    PositionError, PositionEvent, PositionSource, ScriptedPositionSource,
};
use geoguide_events::{BroadcastEventBus, EmittedEvent};
use geoguide_pins::{apply_edit, load_pins_or_default, Pin, PinRepository};
use geoguide_storage::Database;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

const NARRATION_LENGTH: Duration = Duration::from_secs(10);
const WALK_STEP_M: f64 = 10.0;
const WALK_INTERVAL: Duration = Duration::from_secs(1);

/// Log what a UI subscribed to the bus would receive.
async fn log_events(mut events: broadcast::Receiver<EmittedEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::info!(topic = %event.topic, payload = %event.payload, "Event"),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Event log fell behind")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    db: Option<PathBuf>,
    walk: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let mut args = Self::default();
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--db" => {
                    let path = iter.next().context("--db needs a path")?;
                    args.db = Some(PathBuf::from(path));
                }
                "--walk" => args.walk = true,
                "-h" | "--help" => {
                    println!("usage: geoguide [--db <path>] [--walk]\n\n{HELP}");
                    std::process::exit(0);
                }
                other => anyhow::bail!("unknown argument: {other}"),
            }
        }
        Ok(args)
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geoguide")
        .join("geoguide.db")
}

fn open_database(path: PathBuf) -> anyhow::Result<Database> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tracing::info!(path = %path.display(), "Opening database");
    Database::open(&path).with_context(|| format!("failed to open {}", path.display()))
}

/// Walk the tour in pin order, one step per interval.
fn walking_tour(pins: &[Pin]) -> ScriptedPositionSource {
    let waypoints: Vec<_> = pins.iter().map(Pin::position).collect();
    let events = walk_route(&waypoints, WALK_STEP_M)
        .into_iter()
        .map(PositionEvent::from)
        .collect();
    ScriptedPositionSource::new(events).with_interval(WALK_INTERVAL)
}

fn print_status(snapshot: &GuideSnapshot) {
    let position = snapshot
        .position
        .map(|p| p.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let pin = snapshot
        .active_pin
        .as_ref()
        .map(|p| format!("{} ({})", p.name, p.id))
        .unwrap_or_else(|| "none".to_string());
    let distance = snapshot
        .distance_m
        .map(|d| format!("{d:.1} m"))
        .unwrap_or_else(|| "-".to_string());

    println!("started:  {}", snapshot.started);
    println!("position: {position}");
    println!("active:   {pin}, distance {distance}");
    println!(
        "playback: {} {:.0}%",
        snapshot.playback.state,
        snapshot.playback.progress * 100.0
    );
}

fn print_pins(pins: &[Pin]) {
    for pin in pins {
        println!(
            "{:<8} {:<12} {:>10.5}, {:<10.5} r={:<6} {:<16} {}",
            pin.id.as_str(),
            pin.name,
            pin.lat,
            pin.lng,
            pin.radius_m,
            pin.label,
            pin.audio.as_str()
        );
    }
}

async fn dispatch(
    command: Command,
    handle: &GuideHandle,
    snapshot: GuideSnapshot,
    db: &Database,
    pins: &mut Vec<Pin>,
) -> anyhow::Result<()> {
    match command {
        Command::MoveTo(position) => handle.position(position.into()).await?,
        Command::Lost => {
            handle
                .position(PositionEvent::Error(PositionError::Unavailable(
                    "signal lost".into(),
                )))
                .await?
        }
        Command::Start => handle.start().await?,
        Command::Toggle => handle.toggle().await?,
        Command::Restart => handle.restart().await?,
        Command::Fail => handle.playback_error("Failed to load audio file")?,
        Command::Status => print_status(&snapshot),
        Command::Pins => print_pins(pins),
        Command::Edit(edit) => {
            let mut edited = pins.clone();
            apply_edit(&mut edited, edit)?;
            db.save(&edited)?;
            *pins = edited;
            println!("saved, takes effect on next launch");
        }
        Command::Reset => {
            *pins = db.reset_to_default()?;
            println!("default tour restored, takes effect on next launch");
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,geoguide=debug")),
        )
        .init();

    let args = Args::parse()?;
    tracing::info!("Starting geoguide");

    let db = open_database(args.db.unwrap_or_else(default_db_path))?;
    let config = GuideConfig::load(&db);
    let mut pins = load_pins_or_default(&db);
    tracing::info!(pins = pins.len(), radius_policy = ?config.radius_policy, "Tour loaded");

    let runtime = GuideRuntime::new(config.event_queue_capacity);
    let channel = SimulatedChannel::new(runtime.handle(), NARRATION_LENGTH);
    let bus = Arc::new(BroadcastEventBus::new(config.event_queue_capacity));
    let logger = tokio::spawn(log_events(bus.subscribe()));
    let engine = GuideEngine::new(config, pins.clone(), channel, bus);

    let positions = if args.walk {
        walking_tour(&pins).subscribe()
    } else {
        futures::stream::empty().boxed()
    };
    let guide = runtime.spawn(engine, positions);
    if args.walk {
        guide.handle.start().await?;
    }

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        let snapshot = guide.snapshots.borrow().clone();
        if let Err(e) = dispatch(command, &guide.handle, snapshot, &db, &mut pins).await {
            println!("error: {e:#}");
        }
    }

    if let Some(engine) = guide.shutdown().await {
        tracing::info!(state = %engine.snapshot().playback.state, "Guide stopped");
    }
    // The bus closed with the engine, so the logger drains and exits.
    let _ = logger.await;
    Ok(())
}
