//! Headless Skirmish match server.
//!
//! Loads `config.ron` (creating it on first run), applies CLI overrides,
//! then runs one authority node and N observer nodes in-process over the
//! channel mesh. Bots are spawned on the authority and the match is
//! simulated at a fixed tick rate until it ends or `max_seconds` elapses.
//!
//! Run with: `cargo run -p skirmish-server -- --mode arena --kill-limit 5`

mod bots;
mod scoreboard;

use std::path::PathBuf;

use clap::Parser;
use skirmish_config::{CliArgs, Config, ConfigError, default_config_dir};
use skirmish_match::{Collaborators, Session, TickSchedule};
use skirmish_net::{CommandBus, LinkFaults, NodeId, channel_mesh};
use tracing::{info, warn};

use crate::scoreboard::Scoreboard;

/// Simulated frame length fed to the tick schedule.
const FRAME_SECS: f64 = 1.0 / 60.0;

/// Seconds between scoreboard lines.
const SCOREBOARD_INTERVAL_SECS: f64 = 5.0;

/// Resolve the config directory and load from it. A load failure falls
/// back to defaults and is returned for logging once the subscriber is up.
fn load_config(args: &CliArgs) -> (Config, Option<PathBuf>, Option<ConfigError>) {
    let dir = args.config.clone().or_else(|| default_config_dir().ok());
    let (mut config, error) = match dir.as_deref().map(Config::load_or_create) {
        Some(Ok(config)) => (config, None),
        Some(Err(err)) => (Config::with_default_loadout(), Some(err)),
        None => (Config::with_default_loadout(), None),
    };
    config.apply_cli_overrides(args);
    (config, dir, error)
}

fn build_nodes(config: &Config) -> Vec<Session> {
    let authority = NodeId(config.session.authority_node);
    let mut ids = vec![authority];
    ids.extend((0..config.session.observers).map(|i| NodeId(authority.0 + 1 + i)));

    channel_mesh(&ids, LinkFaults::default())
        .into_iter()
        .map(|transport| {
            let local = transport.local();
            let bus = CommandBus::new(local, authority, ids.clone(), Box::new(transport));
            Session::new(config, bus, Collaborators::default())
        })
        .collect()
}

fn main() {
    let args = CliArgs::parse();
    let (config, config_dir, load_error) = load_config(&args);

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    skirmish_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));
    if let Some(err) = load_error {
        warn!("Config unusable ({}), running with defaults", err);
    }

    info!(
        "Skirmish server: {:?}, {} teams x {}, {} observers, {} Hz",
        config.game.mode,
        config.game.team_count,
        config.game.players_per_team,
        config.session.observers,
        config.session.tick_rate
    );

    let mut nodes = build_nodes(&config);
    let node_ids: Vec<NodeId> = nodes.iter().map(Session::local_node).collect();
    let Some(authority) = nodes.first_mut() else {
        warn!("No nodes to run");
        return;
    };

    if let Err(err) = authority.initialize_match(config.game.clone()) {
        warn!("Cannot start match: {}", err);
        return;
    }
    bots::spawn_bots(authority, &config.game, &config.bots, &node_ids);
    authority.mark_teams_assigned_and_ready();

    let mut schedule = TickSchedule::with_tick_rate(config.session.tick_rate);
    let dt = schedule.tick_duration_secs();
    let mut next_report = 0.0;

    while schedule.elapsed_secs() < config.session.max_seconds {
        for _ in 0..schedule.accumulate(FRAME_SECS) {
            bots::steer_all(&mut nodes[0], config.bots.move_speed, dt as f32);
            for node in &mut nodes {
                node.tick(dt);
            }
        }

        if schedule.elapsed_secs() >= next_report {
            info!("{}", Scoreboard::capture(&nodes[0]).format_line());
            next_report += SCOREBOARD_INTERVAL_SECS;
        }
        if nodes.iter().all(Session::is_finished) {
            break;
        }
    }

    for node in &nodes {
        info!(
            "{} final: {} ({} ticks, {:?})",
            node.local_node(),
            Scoreboard::capture(node).format_line(),
            schedule.total_ticks(),
            node.bus().stats()
        );
    }
    if !nodes.iter().all(Session::is_finished) {
        warn!(
            "Match still running after {:.1}s, stopping",
            schedule.elapsed_secs()
        );
    }
}
