//! conductor - drive AV rooms to a requested state
//!
//! Subcommands:
//! - `conductor apply --state room.json` - set a room's state, print outcomes
//! - `conductor route --building B --room R --sink S --source I` - trace a signal path
//! - `conductor config` - print the effective configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use conductor::{
    DeviceStore, EventPublisher, EvaluatorRegistry, Executor, HttpDeviceClient,
    HttpEventPublisher, InventoryStore, LogPublisher, RoomController,
};
use roomconf::RoomConfig;
use roomproto::RoomState;
use serde_json::json;
use signalpath::SignalGraph;

#[derive(Parser)]
#[command(name = "conductor")]
#[command(about = "Reconcile AV room state and dispatch device commands")]
#[command(version)]
struct Cli {
    /// Config file, replacing ./conductor.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set a room's state from a JSON file
    Apply {
        /// Room state JSON (camelCase fields)
        #[arg(short, long)]
        state: PathBuf,

        /// Who is asking, recorded on every event
        #[arg(short, long, default_value = "conductor")]
        requestor: String,

        /// Print the planned chains instead of executing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Check whether a source reaches a sink and print the path
    Route {
        #[arg(long)]
        building: String,

        #[arg(long)]
        room: String,

        /// Device the signal ends at (display, speaker)
        #[arg(long)]
        sink: String,

        /// Device the signal starts at (laptop, camera)
        #[arg(long)]
        source: String,
    },

    /// Print the effective configuration and where it came from
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = RoomConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    conductor::telemetry::init(&config.infra.telemetry)
        .context("Failed to initialize telemetry")?;

    match cli.command {
        Commands::Apply {
            state,
            requestor,
            dry_run,
        } => apply(&config, &state, &requestor, dry_run).await,
        Commands::Route {
            building,
            room,
            sink,
            source,
        } => route(&config, &building, &room, &sink, &source).await,
        Commands::Config => {
            print!("{}", config.to_toml());
            println!();
            for file in &sources.files {
                println!("# loaded: {}", file.display());
            }
            for var in &sources.env_overrides {
                println!("# env: {var}");
            }
            Ok(())
        }
    }
}

async fn load_store(config: &RoomConfig) -> Result<InventoryStore> {
    let path = &config.infra.paths.inventory;
    InventoryStore::load(path)
        .await
        .with_context(|| format!("Failed to load inventory from {}", path.display()))
}

fn build_registry(config: &RoomConfig) -> Result<EvaluatorRegistry> {
    let mut registry = EvaluatorRegistry::with_defaults();
    let unknown = registry.apply_priorities(&config.bootstrap.priorities);
    if !unknown.is_empty() {
        anyhow::bail!(
            "[bootstrap.priorities] names unknown evaluators: {}",
            unknown.join(", ")
        );
    }
    Ok(registry)
}

fn build_publisher(config: &RoomConfig) -> Result<Arc<dyn EventPublisher>> {
    let url = &config.infra.events.router_url;
    if url.is_empty() {
        return Ok(Arc::new(LogPublisher));
    }
    let publisher =
        HttpEventPublisher::new(url.as_str()).context("Failed to build event publisher")?;
    Ok(Arc::new(publisher))
}

async fn apply(
    config: &RoomConfig,
    state_path: &Path,
    requestor: &str,
    dry_run: bool,
) -> Result<()> {
    let content = tokio::fs::read_to_string(state_path)
        .await
        .with_context(|| format!("Failed to read {}", state_path.display()))?;
    let target: RoomState = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse room state {}", state_path.display()))?;

    let store = Arc::new(load_store(config).await?);
    let client = HttpDeviceClient::new(
        config.device_timeout(),
        config.infra.devices.bearer_token.clone(),
    )
    .context("Failed to build device client")?;
    let executor = Executor::new(
        Arc::new(client),
        build_publisher(config)?,
        config.device_timeout(),
    );
    let controller = RoomController::new(store, Arc::new(build_registry(config)?), executor);

    if dry_run {
        let graph = controller
            .plan(&target, requestor)
            .await
            .context("Failed to plan room state")?;
        let chains: Vec<_> = graph
            .chains()
            .iter()
            .map(|chain| {
                chain
                    .iter()
                    .map(|a| {
                        json!({
                            "action": a.name,
                            "generator": a.generator,
                            "device": a.device.id,
                            "destinationDevice": a.destination_device.id,
                            "parameters": a.parameters,
                            "overridden": a.overridden,
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json!({ "chains": chains }))?);
        return Ok(());
    }

    let report = controller
        .set_room_state(&target, requestor)
        .await
        .context("Failed to set room state")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_clean() {
        tracing::warn!(
            failures = report.failures().count(),
            "some device commands failed"
        );
    }
    Ok(())
}

async fn route(
    config: &RoomConfig,
    building: &str,
    room: &str,
    sink: &str,
    source: &str,
) -> Result<()> {
    let store = load_store(config).await?;
    let devices = store
        .devices_in_room(building, room)
        .await
        .with_context(|| format!("Failed to read devices for {building}-{room}"))?;

    let graph = SignalGraph::build(&devices);
    let path = graph
        .reachable(sink, source)
        .with_context(|| format!("Failed to route {source} to {sink}"))?;

    let path_ids: Vec<&str> = path.as_ref().map(|p| p.ids()).unwrap_or_default();
    let output = json!({
        "sink": sink,
        "source": source,
        "reachable": path.is_some(),
        "path": path_ids,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
