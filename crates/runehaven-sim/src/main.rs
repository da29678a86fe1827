//! # Runehaven Simulator
//!
//! Headless driver for the Runehaven combat subsystem.
//!
//! Runs a configured encounter between the player and NPC spawns:
//! - Frame updates for engagement cycles, respawns and facing
//! - Game ticks for threat discovery, admission and leash resets
//! - Player auto-attacks and event-driven NPC movement

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod movement;
mod timing;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{SimConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("runehaven=info".parse()?))
        .init();

    info!("Runehaven simulator starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let mut config = SimConfig::load_from(&config_path);
    config.validate();
    if !config_path.exists() {
        if let Err(e) = config.save_to(&config_path) {
            warn!("Failed to write default config: {e}");
        }
    }

    let report = app::run(config)?;

    info!(
        "Finished after {:.1} s ({} ticks): {} NPC deaths, {} player kills, {} NPC kills, {} respawns",
        report.elapsed,
        report.ticks,
        report.npc_deaths,
        report.player_kills,
        report.npc_kills,
        report.respawns
    );
    info!(
        "Player dealt {} and took {} damage, died {} times",
        report.damage_dealt, report.damage_taken, report.player_deaths
    );
    Ok(())
}
