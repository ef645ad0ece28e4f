//! RetroDeck companion
//!
//! Watches for a running emulator, works out which game it is running and
//! prints every state change as one JSON line on stdout for the companion
//! screen. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use retrodeck_catalog::{ArtworkResolver, CatalogIndex};
use retrodeck_config::CompanionConfig;
use retrodeck_controls::{ControlResolver, PositionKey};
use retrodeck_emulator::{
    RetroArchCommand, RetroArchRemote, default_process_query, ensure_network_cmd_enabled,
};
use retrodeck_watcher::{GameResolver, GameWatcher};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "retrodeck-companion", version, about)]
struct Cli {
    /// Config file (default: $RETRODECK_CONFIG, then ./retrodeck.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch for running games and print each state change (default)
    Watch,

    /// Resolve a ROM path the way the watcher would
    Lookup {
        /// ROM or disc image path as it appears on the emulator command line
        rom: String,
    },

    /// Resolve the controller map for a game
    Controls { title: String, platform: String },

    /// Set one position of a game's manual override (empty label removes it)
    Override {
        title: String,
        /// Position key, e.g. faceBottom or shoulderL
        position: PositionKey,
        label: String,
    },

    /// Send a command to a running RetroArch
    Retroarch {
        /// save-state or load-state
        command: RetroArchCommand,

        /// Turn on RetroArch's network commands in retroarch.cfg first
        #[arg(long)]
        enable: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(&config).await,
        Command::Lookup { rom } => lookup(&config, &rom).await,
        Command::Controls { title, platform } => controls(&config, &title, &platform).await,
        Command::Override {
            title,
            position,
            label,
        } => save_override(&config, &title, position, &label),
        Command::Retroarch { command, enable } => retroarch(&config, command, enable).await,
    }
}

/// Setup logging on stderr; stdout is reserved for JSON output
fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CompanionConfig> {
    match path {
        Some(path) => CompanionConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => CompanionConfig::load_default().context("Failed to load config"),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

async fn game_resolver(config: &CompanionConfig) -> Result<GameResolver> {
    let root = config.launchbox.root.clone();
    let platforms_dir = config.platforms_dir();
    let catalog =
        tokio::task::spawn_blocking(move || CatalogIndex::build_from(root, &platforms_dir))
            .await
            .context("Catalog build task failed")?;

    Ok(GameResolver::new(Arc::new(catalog)).with_artwork(ArtworkResolver::new(config.images_dir())))
}

async fn watch(config: &CompanionConfig) -> Result<()> {
    info!("RetroDeck companion starting...");

    let games = game_resolver(config).await?;
    let controls = ControlResolver::from_config(config)
        .context("Failed to set up controller map resolution")?;

    let watcher = Arc::new(
        GameWatcher::new(default_process_query(), games)
            .with_config(&config.watcher)
            .with_controls(Arc::new(controls)),
    );

    let mut states = watcher.subscribe();
    print_json(&watcher.current_state())?;
    watcher.start();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Could not listen for Ctrl-C: {}", e);
                }
                break;
            }
            received = states.recv() => match received {
                Ok(state) => print_json(&state)?,
                Err(RecvError::Lagged(skipped)) => warn!("Dropped {} state updates", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("Shutting down...");
    watcher.stop().await;
    Ok(())
}

async fn lookup(config: &CompanionConfig, rom: &str) -> Result<()> {
    let games = game_resolver(config).await?;
    let game = games.resolve(rom).await;

    if !game.is_cataloged() {
        warn!("{} is not in the catalog", rom);
    }
    print_json(&game)
}

async fn controls(config: &CompanionConfig, title: &str, platform: &str) -> Result<()> {
    let resolver = ControlResolver::from_config(config)?;

    match resolver.resolve_with_source(title, platform).await {
        Some(resolved) => {
            info!(
                "Resolved {} positions from {}",
                resolved.map.len(),
                resolved.source.as_str()
            );
            print_json(&resolved)
        }
        None => {
            warn!("No controller map available for \"{}\" ({})", title, platform);
            print_json(&json!(null))
        }
    }
}

fn save_override(
    config: &CompanionConfig,
    title: &str,
    position: PositionKey,
    label: &str,
) -> Result<()> {
    let resolver = ControlResolver::from_config(config)?;
    let map = resolver
        .save_override(title, position, label)
        .with_context(|| format!("Failed to save override for \"{}\"", title))?;

    print_json(&json!({ "title": title, "override": map }))
}

async fn retroarch(config: &CompanionConfig, command: RetroArchCommand, enable: bool) -> Result<()> {
    if enable {
        let cfg_path = config.retroarch_config_path();
        let changed = ensure_network_cmd_enabled(&cfg_path)
            .with_context(|| format!("Failed to update {}", cfg_path.display()))?;
        if changed {
            info!("Network commands enabled; restart RetroArch for this to take effect");
        }
    }

    RetroArchRemote::new(config.retroarch.host.clone(), config.retroarch.port)
        .send(command)
        .await
        .with_context(|| format!("Failed to send {} to RetroArch", command))?;
    Ok(())
}
