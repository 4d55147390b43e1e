#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that loads a level and walks the controlled agent to a destination.

mod config;
mod session;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use gridnav_core::{CellCoord, Command};
use gridnav_system_movement::TickOutcome;
use gridnav_world::level::Level;
use log::info;

use crate::{
    config::SimulationConfig,
    session::{farthest_walkable, Session},
};

/// Headless gridnav simulation.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// ASCII level file to load.
    #[arg(long, value_name = "PATH")]
    level: PathBuf,
    /// TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Number of ticks to simulate; overrides the configuration.
    #[arg(long)]
    ticks: Option<u64>,
    /// Destination of the controlled agent as `column,row`.
    #[arg(long, value_name = "X,Y", value_parser = parse_cell)]
    destination: Option<CellCoord>,
    /// Tick at which every locked door is unlocked.
    #[arg(long, value_name = "TICK")]
    unlock_at: Option<u64>,
}

/// Entry point for the gridnav command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let text = fs::read_to_string(&cli.level)
        .with_context(|| format!("failed to read level at {}", cli.level.display()))?;
    let level = Level::parse(&text)
        .with_context(|| format!("failed to parse level at {}", cli.level.display()))?;

    let mut session = Session::new(&level, config.navigation);
    let agent = session
        .controlled()
        .context("level has no controlled spawn (`@`)")?;
    let origin = session
        .agent_cell(agent)
        .context("controlled agent was not spawned")?;
    let destination = match cli.destination {
        Some(cell) => cell,
        None => farthest_walkable(&level, &config.navigation, origin)
            .context("level has no walkable cell")?,
    };
    let ticks = cli.ticks.unwrap_or(config.ticks);

    info!(
        "level {}x{} (doors {:?}), agent {agent} at {origin}, destination {destination}, {ticks} ticks",
        level.width(),
        level.height(),
        session.door_policy()
    );
    session.submit(Command::SetDestination {
        agent,
        cell: destination,
    });

    let mut arrived = false;
    for tick in 0..ticks {
        if cli.unlock_at == Some(tick) {
            session.submit(Command::UnlockDoors);
            session.submit(Command::SetDestination {
                agent,
                cell: destination,
            });
        }

        let Some(report) = session
            .step()
            .iter()
            .find(|report| report.agent == agent)
            .copied()
        else {
            continue;
        };
        println!(
            "tick {:>4}  {:>8.2} {:>8.2}  {:?}",
            report.tick, report.position.x, report.position.y, report.state
        );

        match report.outcome {
            TickOutcome::Arrived { .. } => {
                arrived = true;
                break;
            }
            TickOutcome::Blocked { reason } => {
                info!("no route to {destination}: {reason:?}");
            }
            _ => {}
        }
    }

    let position = session.position(agent).unwrap_or_default();
    let cell = session.agent_cell(agent).unwrap_or(origin);
    println!(
        "summary: arrived={arrived} ticks={} cell={cell} position=({:.2}, {:.2}) remaining_waypoints={} rejected_commands={}",
        session.tick_index(),
        position.x,
        position.y,
        session.path(agent).len(),
        session.rejected()
    );

    Ok(())
}

fn parse_cell(value: &str) -> Result<CellCoord, String> {
    let (column, row) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `column,row`, got `{value}`"))?;
    let column = column
        .trim()
        .parse()
        .map_err(|error| format!("invalid column `{column}`: {error}"))?;
    let row = row
        .trim()
        .parse()
        .map_err(|error| format!("invalid row `{row}`: {error}"))?;
    Ok(CellCoord::new(column, row))
}
