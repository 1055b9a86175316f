//! Command-line argument parsing for the Skirmish server.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, MatchMode};

/// Skirmish server command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "skirmish", about = "Headless Skirmish match server")]
pub struct CliArgs {
    /// Match mode.
    #[arg(long, value_enum)]
    pub mode: Option<MatchMode>,

    /// Number of teams.
    #[arg(long)]
    pub teams: Option<u8>,

    /// Players on each team.
    #[arg(long)]
    pub players_per_team: Option<u8>,

    /// Team-Deathmatch duration in seconds.
    #[arg(long)]
    pub duration: Option<u32>,

    /// Arena kill limit.
    #[arg(long)]
    pub kill_limit: Option<i32>,

    /// Number of observer nodes.
    #[arg(long)]
    pub observers: Option<u32>,

    /// Simulation tick rate (Hz).
    #[arg(long)]
    pub tick_rate: Option<u32>,

    /// Hard cap on simulated seconds.
    #[arg(long)]
    pub max_seconds: Option<f64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(mode) = args.mode {
            self.game.mode = mode;
        }
        if let Some(teams) = args.teams {
            self.game.team_count = teams;
        }
        if let Some(ppt) = args.players_per_team {
            self.game.players_per_team = ppt;
        }
        if let Some(duration) = args.duration {
            self.game.match_duration_secs = duration;
        }
        if let Some(limit) = args.kill_limit {
            self.game.kill_limit = limit;
        }
        if let Some(observers) = args.observers {
            self.session.observers = observers;
        }
        if let Some(rate) = args.tick_rate {
            self.session.tick_rate = rate;
        }
        if let Some(secs) = args.max_seconds {
            self.session.max_seconds = secs;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
