//! Configuration for Skirmish sessions.
//!
//! Match, combat, skill and reward tunables persist to disk as `config.ron`.
//! Supports CLI overrides via clap, hot-reload detection, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BotConfig, CombatConfig, Config, DebugConfig, DotConfig, Element, MatchConfig, MatchMode,
    RewardConfig, SafeZoneConfig, SessionConfig, SkillConfig, ZoneStage, default_config_dir,
};
pub use error::ConfigError;
