//! Skill casting: per-actor cooldowns, target selection and wave fire.
//!
//! The authority decides *when* an actor casts ([`SkillCastCoordinator::update`])
//! and publishes a compact [`CastDescriptor`]. Observers replay the same
//! firing routine from the descriptor ([`SkillCastCoordinator::execute_remote`])
//! without re-evaluating cooldowns or targeting. Shots of one wave are spread
//! over time by the session's scheduler using [`PlannedShot::delay`].

use std::sync::Arc;

use glam::{Quat, Vec3};
use skirmish_config::SkillConfig;
use skirmish_net::{CastSkill, Command, EntityId};

use crate::entity::{ActorView, EntityRegistry};

/// Spread at or above which a linear wave wraps to a full circle.
pub const FULL_CIRCLE_SPREAD_DEG: f32 = 359.5;

// ---------------------------------------------------------------------------
// Wave fire
// ---------------------------------------------------------------------------

/// Yaw offsets (degrees) of each shot in a wave, relative to the aim.
pub fn wave_angles(skill: &SkillConfig) -> Vec<f32> {
    let n = skill.shots;
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ if !skill.custom_angles_deg.is_empty() => {
            let custom = &skill.custom_angles_deg;
            (0..n as usize).map(|i| custom[i % custom.len()]).collect()
        }
        _ if skill.orbital || skill.spread_deg >= FULL_CIRCLE_SPREAD_DEG => {
            let step = 360.0 / n as f32;
            (0..n).map(|i| i as f32 * step).collect()
        }
        _ => {
            let half = skill.spread_deg * 0.5;
            let step = skill.spread_deg / (n - 1) as f32;
            (0..n).map(|i| -half + i as f32 * step).collect()
        }
    }
}

/// Direction of every shot in a wave, rotating `base` about the up axis.
pub fn wave_directions(base: Vec3, skill: &SkillConfig) -> Vec<Vec3> {
    let base = base.try_normalize().unwrap_or(Vec3::Z);
    wave_angles(skill)
        .into_iter()
        .map(|deg| Quat::from_rotation_y(deg.to_radians()) * base)
        .collect()
}

// ---------------------------------------------------------------------------
// Cast descriptors
// ---------------------------------------------------------------------------

/// What observers need to replay a cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastDescriptor {
    pub actor: EntityId,
    pub skill_index: u8,
    /// Unit aim direction.
    pub direction: Vec3,
}

impl CastDescriptor {
    pub fn to_command(&self) -> Command {
        Command::CastSkill(CastSkill {
            actor: self.actor,
            skill_index: self.skill_index,
            direction: self.direction.to_array(),
        })
    }

    pub fn from_command(cast: &CastSkill) -> Self {
        Self {
            actor: cast.actor,
            skill_index: cast.skill_index,
            direction: Vec3::from_array(cast.direction),
        }
    }
}

/// One shot of a wave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedShot {
    /// Index within the wave.
    pub shot: u32,
    pub direction: Vec3,
    /// Seconds after the cast this shot leaves.
    pub delay: f64,
}

// ---------------------------------------------------------------------------
// SkillCaster
// ---------------------------------------------------------------------------

/// Caster state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastState {
    Idle,
    Casting { skill_index: u8, shots_left: u32 },
}

/// Cooldowns and cast state of one actor.
#[derive(Debug, Clone)]
pub struct SkillCaster {
    loadout: Arc<[SkillConfig]>,
    cooldowns: Vec<f32>,
    state: CastState,
}

impl SkillCaster {
    /// Every skill starts ready.
    pub fn new(loadout: Arc<[SkillConfig]>) -> Self {
        let cooldowns = vec![0.0; loadout.len()];
        Self {
            loadout,
            cooldowns,
            state: CastState::Idle,
        }
    }

    pub fn loadout(&self) -> &[SkillConfig] {
        &self.loadout
    }

    pub fn skill(&self, index: u8) -> Option<&SkillConfig> {
        self.loadout.get(usize::from(index))
    }

    /// Seconds until skill `index` is ready.
    pub fn cooldown(&self, index: u8) -> Option<f32> {
        self.cooldowns.get(usize::from(index)).copied()
    }

    pub fn state(&self) -> CastState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == CastState::Idle
    }

    pub fn tick_cooldowns(&mut self, dt: f32) {
        for cooldown in &mut self.cooldowns {
            *cooldown = (*cooldown - dt).max(0.0);
        }
    }

    /// First skill that is off cooldown and reaches a target `distance` away.
    pub fn ready_skill(&self, distance: f32) -> Option<u8> {
        if !self.is_idle() {
            return None;
        }
        self.loadout
            .iter()
            .zip(&self.cooldowns)
            .position(|(skill, cd)| *cd <= 0.0 && skill.shots > 0 && distance <= skill.range)
            .and_then(|index| u8::try_from(index).ok())
    }

    /// Start casting `index`, putting it on cooldown.
    pub fn begin_cast(&mut self, index: u8) -> bool {
        if !self.is_idle() {
            return false;
        }
        let Some(skill) = self.loadout.get(usize::from(index)) else {
            return false;
        };
        if skill.shots == 0 {
            return false;
        }
        self.cooldowns[usize::from(index)] = skill.cooldown_secs;
        self.state = CastState::Casting {
            skill_index: index,
            shots_left: skill.shots,
        };
        true
    }

    /// Mirror a cast decided elsewhere. Cooldowns are left alone.
    pub fn begin_replay(&mut self, index: u8) {
        if let Some(skill) = self.loadout.get(usize::from(index)) {
            self.state = CastState::Casting {
                skill_index: index,
                shots_left: skill.shots,
            };
        }
    }

    /// Count one shot out. Returns `true` when the wave is done.
    pub fn shot_fired(&mut self) -> bool {
        match &mut self.state {
            CastState::Casting { shots_left, .. } if *shots_left > 1 => {
                *shots_left -= 1;
                false
            }
            CastState::Casting { .. } => {
                self.state = CastState::Idle;
                true
            }
            CastState::Idle => true,
        }
    }

    /// Abort the current cast.
    pub fn interrupt(&mut self) {
        self.state = CastState::Idle;
    }
}

// ---------------------------------------------------------------------------
// SkillCastCoordinator
// ---------------------------------------------------------------------------

/// Drives every caster in a registry.
#[derive(Debug, Clone)]
pub struct SkillCastCoordinator {
    loadout: Arc<[SkillConfig]>,
}

impl SkillCastCoordinator {
    pub fn new(loadout: Vec<SkillConfig>) -> Self {
        Self {
            loadout: loadout.into(),
        }
    }

    /// A fresh caster with the shared loadout.
    pub fn new_caster(&self) -> SkillCaster {
        SkillCaster::new(Arc::clone(&self.loadout))
    }

    pub fn loadout(&self) -> &[SkillConfig] {
        &self.loadout
    }

    /// Advance cooldowns and start a cast for every idle living actor with a
    /// ready skill and an enemy in range. Authority only.
    pub fn update(&self, registry: &mut EntityRegistry, dt: f32) -> Vec<CastDescriptor> {
        registry.tick_cooldowns(dt);
        let views = registry.actor_views();
        let mut casts = Vec::new();

        for actor in views.iter().filter(|v| v.alive) {
            let Some(caster) = registry.caster(actor.id) else {
                continue;
            };
            let Some(target) = nearest_enemy(actor, &views) else {
                continue;
            };
            let Some(index) = caster.ready_skill(actor.position.distance(target.position)) else {
                continue;
            };
            let direction = (target.position - actor.position)
                .try_normalize()
                .unwrap_or(Vec3::Z);

            if registry
                .caster_mut(actor.id)
                .is_some_and(|caster| caster.begin_cast(index))
            {
                tracing::trace!("{} casts skill {} at {}", actor.id, index, target.id);
                casts.push(CastDescriptor {
                    actor: actor.id,
                    skill_index: index,
                    direction,
                });
            }
        }
        casts
    }

    /// Shots of a cast, with their delays.
    pub fn plan(&self, registry: &EntityRegistry, cast: &CastDescriptor) -> Option<Vec<PlannedShot>> {
        let skill = registry.caster(cast.actor)?.skill(cast.skill_index)?;
        let interval = skill.shot_interval_secs;
        Some(
            wave_directions(cast.direction, skill)
                .into_iter()
                .enumerate()
                .map(|(i, direction)| PlannedShot {
                    shot: i as u32,
                    direction,
                    delay: i as f64 * interval,
                })
                .collect(),
        )
    }

    /// Replay a cast received from the authority. No cooldown or target checks.
    pub fn execute_remote(
        &self,
        registry: &mut EntityRegistry,
        cast: &CastDescriptor,
    ) -> Option<Vec<PlannedShot>> {
        let shots = self.plan(registry, cast)?;
        if let Some(caster) = registry.caster_mut(cast.actor) {
            caster.begin_replay(cast.skill_index);
        }
        Some(shots)
    }
}

/// Closest living actor on another team. Ties go to the lower id.
pub fn nearest_enemy<'a>(actor: &ActorView, views: &'a [ActorView]) -> Option<&'a ActorView> {
    let mut best: Option<(&ActorView, f32)> = None;
    for other in views {
        if !other.alive || other.team == actor.team {
            continue;
        }
        let d = actor.position.distance_squared(other.position);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((other, d));
        }
    }
    best.map(|(view, _)| view)
}
