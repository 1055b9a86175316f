//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Node layout and tick rate.
    pub session: SessionConfig,
    /// Damage formula tunables.
    pub combat: CombatConfig,
    /// Match mode and mode-specific tunables.
    pub game: MatchConfig,
    /// Skill loadout handed to every combatant.
    pub skills: Vec<SkillConfig>,
    /// Gold/xp handed out in match result records.
    pub rewards: RewardConfig,
    /// Stats used by the headless bot simulation.
    pub bots: BotConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Session layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Simulation tick rate (Hz) on every node.
    pub tick_rate: u32,
    /// Number of observer nodes besides the authority.
    pub observers: u32,
    /// Node id holding authority.
    pub authority_node: u32,
    /// Hard cap on simulated seconds before the session is torn down.
    pub max_seconds: f64,
}

/// Combat formula configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CombatConfig {
    /// Damage multiplier for critical hits.
    pub crit_multiplier: f32,
    /// Multiplier when the attacker's element beats the target's.
    pub advantage_multiplier: f32,
    /// Multiplier when the target's element beats the attacker's.
    pub disadvantage_multiplier: f32,
    /// Floor applied after mitigation.
    pub min_damage: f32,
    /// How long an accepted hit key is remembered, in seconds.
    pub hit_dedup_ttl_secs: f64,
    /// Delay before a dead combatant revives (modes with revives only).
    pub respawn_delay_secs: f64,
}

/// PVP match mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum MatchMode {
    /// Timed match, highest team score wins.
    TeamDeathmatch,
    /// First team to the kill limit wins.
    Arena,
    /// Last team standing inside a shrinking zone.
    BattleRoyale,
}

/// Match configuration. Fixed once the match is running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Which mode policy drives scoring and win conditions.
    pub mode: MatchMode,
    /// Number of teams.
    pub team_count: u8,
    /// Players on each team.
    pub players_per_team: u8,
    /// Score awarded per kill in Team-Deathmatch.
    pub points_per_kill: i32,
    /// Team-Deathmatch length in whole seconds.
    pub match_duration_secs: u32,
    /// Arena score at which a team wins.
    pub kill_limit: i32,
    /// Battle-Royale boundary.
    pub zone: SafeZoneConfig,
}

/// One shrink stage of the safe zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneStage {
    /// Seconds spent interpolating to `target_radius`.
    pub duration_secs: f32,
    /// Radius reached at the end of the stage.
    pub target_radius: f32,
}

/// Battle-Royale safe zone configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SafeZoneConfig {
    /// Zone center on the ground plane (x, z).
    pub center: [f32; 2],
    /// Radius before the first stage.
    pub initial_radius: f32,
    /// Shrink schedule, in order.
    pub stages: Vec<ZoneStage>,
    /// Hold time between consecutive stages.
    pub pause_between_stages_secs: f32,
    /// Interval between boundary damage ticks.
    pub tick_interval_secs: f32,
    /// Damage per second taken outside the zone.
    pub damage_per_second_outside: f32,
}

/// Elemental affinity used for type advantage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Element {
    /// No advantage either way.
    #[default]
    Neutral,
    /// Beats Nature.
    Fire,
    /// Beats Fire.
    Water,
    /// Beats Water.
    Nature,
    /// Beats Dark.
    Light,
    /// Beats Light.
    Dark,
}

/// Damage-over-time attached to a skill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DotConfig {
    /// Base damage per tick, before mitigation.
    pub damage_per_tick: f32,
    /// Seconds between ticks.
    pub interval_secs: f64,
    /// Number of ticks.
    pub ticks: u32,
}

/// A skill definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SkillConfig {
    /// Display name.
    pub name: String,
    /// Cooldown in seconds.
    pub cooldown_secs: f32,
    /// Activation range to a valid target.
    pub range: f32,
    /// Projectiles per wave.
    pub shots: u32,
    /// Total spread of the wave in degrees.
    pub spread_deg: f32,
    /// Fire evenly around the full circle.
    pub orbital: bool,
    /// Explicit per-shot angles (degrees), cycled by shot index. Overrides spread.
    pub custom_angles_deg: Vec<f32>,
    /// Delay between consecutive shots of one wave.
    pub shot_interval_secs: f64,
    /// Base damage of each projectile.
    pub base_damage: f32,
    /// Element of the projectiles.
    pub element: Element,
    /// Fraction of applied damage healed back to the caster.
    pub life_steal: f32,
    /// Optional damage-over-time applied on hit.
    pub dot: Option<DotConfig>,
}

/// Reward tunables for match result records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewardConfig {
    /// Gold for a win.
    pub gold_win: u32,
    /// Gold for a loss.
    pub gold_loss: u32,
    /// Gold per kill.
    pub gold_per_kill: u32,
    /// Xp for a win.
    pub xp_win: u32,
    /// Xp for a loss.
    pub xp_loss: u32,
    /// Xp per kill.
    pub xp_per_kill: u32,
}

/// Bot stats for the headless simulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    /// Maximum health.
    pub max_health: f32,
    /// Flat mitigation.
    pub defense: f32,
    /// Movement speed in units per second.
    pub move_speed: f32,
    /// Radius of the spawn ring.
    pub spawn_radius: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            observers: 2,
            authority_node: 0,
            max_seconds: 600.0,
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            crit_multiplier: 1.5,
            advantage_multiplier: 1.5,
            disadvantage_multiplier: 0.75,
            min_damage: 1.0,
            hit_dedup_ttl_secs: 3.0,
            respawn_delay_secs: 5.0,
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::TeamDeathmatch,
            team_count: 2,
            players_per_team: 3,
            points_per_kill: 1,
            match_duration_secs: 180,
            kill_limit: 10,
            zone: SafeZoneConfig::default(),
        }
    }
}

impl Default for SafeZoneConfig {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            initial_radius: 60.0,
            stages: vec![
                ZoneStage {
                    duration_secs: 30.0,
                    target_radius: 40.0,
                },
                ZoneStage {
                    duration_secs: 25.0,
                    target_radius: 20.0,
                },
                ZoneStage {
                    duration_secs: 20.0,
                    target_radius: 5.0,
                },
            ],
            pause_between_stages_secs: 15.0,
            tick_interval_secs: 1.0,
            damage_per_second_outside: 5.0,
        }
    }
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            name: "Bolt".to_string(),
            cooldown_secs: 1.5,
            range: 12.0,
            shots: 1,
            spread_deg: 0.0,
            orbital: false,
            custom_angles_deg: Vec::new(),
            shot_interval_secs: 0.0,
            base_damage: 12.0,
            element: Element::Neutral,
            life_steal: 0.0,
            dot: None,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            gold_win: 100,
            gold_loss: 25,
            gold_per_kill: 10,
            xp_win: 200,
            xp_loss: 50,
            xp_per_kill: 20,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            defense: 2.0,
            move_speed: 3.0,
            spawn_radius: 25.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl SkillConfig {
    /// The default loadout: a single bolt, a fan, an orbital nova and a poison dart.
    pub fn default_loadout() -> Vec<SkillConfig> {
        vec![
            SkillConfig::default(),
            SkillConfig {
                name: "Fan".to_string(),
                cooldown_secs: 4.0,
                range: 8.0,
                shots: 3,
                spread_deg: 90.0,
                shot_interval_secs: 0.1,
                base_damage: 9.0,
                element: Element::Fire,
                ..SkillConfig::default()
            },
            SkillConfig {
                name: "Nova".to_string(),
                cooldown_secs: 9.0,
                range: 5.0,
                shots: 8,
                orbital: true,
                base_damage: 7.0,
                element: Element::Light,
                life_steal: 0.25,
                ..SkillConfig::default()
            },
            SkillConfig {
                name: "Venom".to_string(),
                cooldown_secs: 7.0,
                range: 10.0,
                base_damage: 4.0,
                element: Element::Nature,
                dot: Some(DotConfig {
                    damage_per_tick: 3.0,
                    interval_secs: 1.0,
                    ticks: 4,
                }),
                ..SkillConfig::default()
            },
        ]
    }
}

/// Resolves `<platform config dir>/skirmish`.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("skirmish"))
        .ok_or(ConfigError::NoConfigDir)
}

// --- Load / Save / Reload ---

impl Config {
    /// Default config with the stock skill loadout filled in.
    pub fn with_default_loadout() -> Self {
        Self {
            skills: SkillConfig::default_loadout(),
            ..Self::default()
        }
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::with_default_loadout();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
