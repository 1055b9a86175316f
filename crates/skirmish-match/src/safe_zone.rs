//! Battle-Royale shrinking boundary.
//!
//! The zone starts shrinking toward the first stage's radius as soon as it
//! is created, then alternates pause and shrink for every later stage. Radius
//! interpolates linearly within a stage. Boundary damage is counted in whole
//! ticks of `tick_interval`; the session turns each tick into one hit per
//! entity outside.

use glam::{Vec2, Vec3};
use skirmish_config::{SafeZoneConfig, ZoneStage};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ZonePhase {
    Shrinking { elapsed: f32, from: f32 },
    Paused { remaining: f32 },
    Settled,
}

/// What one [`SafeZone::update`] produced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZoneStep {
    /// The radius moved.
    pub radius_changed: bool,
    /// Whole damage ticks that elapsed.
    pub damage_ticks: u32,
}

/// Authority-side safe zone.
#[derive(Debug, Clone)]
pub struct SafeZone {
    center: Vec2,
    radius: f32,
    stages: Vec<ZoneStage>,
    stage: usize,
    phase: ZonePhase,
    pause_between_stages: f32,
    tick_interval: f32,
    damage_per_second: f32,
    tick_accum: f32,
}

impl SafeZone {
    pub fn from_config(config: &SafeZoneConfig) -> Self {
        let phase = if config.stages.is_empty() {
            ZonePhase::Settled
        } else {
            ZonePhase::Shrinking {
                elapsed: 0.0,
                from: config.initial_radius,
            }
        };
        Self {
            center: Vec2::from_array(config.center),
            radius: config.initial_radius,
            stages: config.stages.clone(),
            stage: 0,
            phase,
            pause_between_stages: config.pause_between_stages_secs,
            tick_interval: config.tick_interval_secs,
            damage_per_second: config.damage_per_second_outside,
            tick_accum: 0.0,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Index of the stage currently shrinking or about to.
    pub fn stage_index(&self) -> usize {
        self.stage
    }

    /// Every stage has finished.
    pub fn is_settled(&self) -> bool {
        self.phase == ZonePhase::Settled
    }

    /// Damage of one boundary tick: `dps × interval`, rounded up.
    pub fn tick_damage(&self) -> f32 {
        (self.damage_per_second * self.tick_interval).ceil()
    }

    /// Whether a world position lies outside the zone (ground plane).
    pub fn is_outside(&self, position: Vec3) -> bool {
        Vec2::new(position.x, position.z).distance(self.center) > self.radius
    }

    /// Advance the shrink schedule and the damage clock by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> ZoneStep {
        let before = self.radius;
        let mut remaining = dt;
        while remaining > 0.0 {
            match self.phase {
                ZonePhase::Settled => break,
                ZonePhase::Paused { remaining: pause } => {
                    if remaining < pause {
                        self.phase = ZonePhase::Paused {
                            remaining: pause - remaining,
                        };
                        remaining = 0.0;
                    } else {
                        remaining -= pause;
                        self.phase = ZonePhase::Shrinking {
                            elapsed: 0.0,
                            from: self.radius,
                        };
                    }
                }
                ZonePhase::Shrinking { elapsed, from } => {
                    let Some(stage) = self.stages.get(self.stage) else {
                        self.phase = ZonePhase::Settled;
                        break;
                    };
                    let left = stage.duration_secs - elapsed;
                    if remaining < left {
                        let elapsed = elapsed + remaining;
                        let t = elapsed / stage.duration_secs;
                        self.radius = from + (stage.target_radius - from) * t;
                        self.phase = ZonePhase::Shrinking { elapsed, from };
                        remaining = 0.0;
                    } else {
                        remaining -= left.max(0.0);
                        self.radius = stage.target_radius;
                        self.stage += 1;
                        self.phase = if self.stage < self.stages.len() {
                            ZonePhase::Paused {
                                remaining: self.pause_between_stages,
                            }
                        } else {
                            ZonePhase::Settled
                        };
                        tracing::debug!("Zone reached stage {} radius {}", self.stage, self.radius);
                    }
                }
            }
        }

        let mut damage_ticks = 0;
        if self.tick_interval > 0.0 {
            self.tick_accum += dt;
            while self.tick_accum >= self.tick_interval {
                self.tick_accum -= self.tick_interval;
                damage_ticks += 1;
            }
        }

        ZoneStep {
            radius_changed: self.radius != before,
            damage_ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> SafeZone {
        SafeZone::from_config(&SafeZoneConfig {
            center: [0.0, 0.0],
            initial_radius: 100.0,
            stages: vec![
                ZoneStage {
                    duration_secs: 10.0,
                    target_radius: 50.0,
                },
                ZoneStage {
                    duration_secs: 5.0,
                    target_radius: 10.0,
                },
            ],
            pause_between_stages_secs: 4.0,
            tick_interval_secs: 1.0,
            damage_per_second_outside: 2.5,
        })
    }

    #[test]
    fn test_linear_interpolation_within_stage() {
        let mut z = zone();
        z.update(5.0);
        assert!((z.radius() - 75.0).abs() < 1e-4);
        z.update(5.0);
        assert_eq!(z.radius(), 50.0);
        assert_eq!(z.stage_index(), 1);
    }

    #[test]
    fn test_pause_between_stages() {
        let mut z = zone();
        z.update(10.0);
        let step = z.update(3.9);
        assert!(!step.radius_changed);
        assert_eq!(z.radius(), 50.0);
        z.update(0.1);
        z.update(2.5);
        assert!((z.radius() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_large_step_crosses_stages() {
        let mut z = zone();
        z.update(100.0);
        assert_eq!(z.radius(), 10.0);
        assert!(z.is_settled());
        assert!(!z.update(5.0).radius_changed);
    }

    #[test]
    fn test_damage_ticks_and_rounding() {
        let mut z = zone();
        assert_eq!(z.tick_damage(), 3.0);
        assert_eq!(z.update(0.6).damage_ticks, 0);
        assert_eq!(z.update(0.6).damage_ticks, 1);
        assert_eq!(z.update(2.0).damage_ticks, 2);
    }

    #[test]
    fn test_outside_check_uses_ground_plane() {
        let mut z = zone();
        z.update(10.0);
        assert!(!z.is_outside(Vec3::new(30.0, 500.0, 30.0)));
        assert!(z.is_outside(Vec3::new(40.0, 0.0, 40.0)));
    }

    #[test]
    fn test_no_stages_never_shrinks() {
        let mut z = SafeZone::from_config(&SafeZoneConfig {
            stages: Vec::new(),
            ..SafeZoneConfig::default()
        });
        assert!(z.is_settled());
        assert!(!z.update(30.0).radius_changed);
        assert_eq!(z.radius(), SafeZoneConfig::default().initial_radius);
    }
}
