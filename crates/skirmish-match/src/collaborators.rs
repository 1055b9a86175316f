//! Interfaces to the systems around the core: object pooling, UI, result
//! persistence and projectile tracing. The session only ever calls out
//! through these traits; every call is fire-and-forget.

use glam::Vec3;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use skirmish_config::MatchMode;
use skirmish_net::EntityId;

use crate::entity::ActorView;

// ---------------------------------------------------------------------------
// Spawner
// ---------------------------------------------------------------------------

/// Opaque handle to a pooled scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u64);

/// What to instantiate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrefabKind {
    /// Visual body of a combatant.
    Combatant { team: u8 },
    /// One projectile of a wave.
    Projectile { skill_index: u8, direction: Vec3 },
}

/// Object creation and release.
pub trait Spawner {
    fn spawn(&mut self, kind: PrefabKind, position: Vec3) -> EntityHandle;
    fn release(&mut self, handle: EntityHandle);
}

/// Counts handles out and back in. Stands in for a real object pool.
#[derive(Debug, Default)]
pub struct PoolSpawner {
    next: u64,
    live: FxHashSet<EntityHandle>,
    projectiles: u64,
}

impl PoolSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles spawned and not yet released.
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Total projectiles requested.
    pub fn projectiles(&self) -> u64 {
        self.projectiles
    }
}

impl Spawner for PoolSpawner {
    fn spawn(&mut self, kind: PrefabKind, _position: Vec3) -> EntityHandle {
        self.next += 1;
        let handle = EntityHandle(self.next);
        match kind {
            // Projectiles expire on their own; the pool reclaims them.
            PrefabKind::Projectile { .. } => self.projectiles += 1,
            PrefabKind::Combatant { .. } => {
                self.live.insert(handle);
            }
        }
        handle
    }

    fn release(&mut self, handle: EntityHandle) {
        if !self.live.remove(&handle) {
            tracing::trace!("Release of unknown handle {:?}", handle);
        }
    }
}

// ---------------------------------------------------------------------------
// UI
// ---------------------------------------------------------------------------

/// Match notifications for the local player. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait MatchUi {
    /// A locally controlled entity died.
    fn show_death_entry(&mut self, victim: EntityId, killer: Option<EntityId>) {}

    fn push_kill_feed(&mut self, killer: Option<EntityId>, victim: EntityId) {}

    fn show_zone(&mut self, center: [f32; 2], radius: f32) {}

    fn show_time_left(&mut self, secs: u32) {}

    fn show_match_end(&mut self, mode: MatchMode, winner: Option<u8>, scores: &[i32]) {}

    /// Battle-Royale placement of a locally controlled participant.
    fn show_placement(&mut self, player: EntityId, placement: u32) {}
}

/// Writes notifications to the log.
#[derive(Debug, Default)]
pub struct TracingUi;

impl MatchUi for TracingUi {
    fn show_death_entry(&mut self, victim: EntityId, killer: Option<EntityId>) {
        tracing::debug!("[ui] {} was defeated by {:?}", victim, killer);
    }

    fn push_kill_feed(&mut self, killer: Option<EntityId>, victim: EntityId) {
        match killer {
            Some(killer) => tracing::debug!("[feed] {} -> {}", killer, victim),
            None => tracing::debug!("[feed] {} eliminated", victim),
        }
    }

    fn show_match_end(&mut self, mode: MatchMode, winner: Option<u8>, scores: &[i32]) {
        tracing::info!("[ui] {:?} over: winner {:?}, scores {:?}", mode, winner, scores);
    }

    fn show_placement(&mut self, player: EntityId, placement: u32) {
        tracing::info!("[ui] {} placed #{}", player, placement);
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a participant takes away from a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResultRecord {
    pub player: EntityId,
    pub team: u8,
    pub won: bool,
    pub placement: u32,
    pub kills: u32,
    pub gold: u32,
    pub xp: u32,
}

/// Session-completion service.
pub trait ResultSink {
    fn submit(&mut self, record: MatchResultRecord);
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub records: Vec<MatchResultRecord>,
}

impl ResultSink for CollectingSink {
    fn submit(&mut self, record: MatchResultRecord) {
        tracing::info!(
            "Result for {}: won={} placement={} kills={} gold={} xp={}",
            record.player,
            record.won,
            record.placement,
            record.kills,
            record.gold,
            record.xp
        );
        self.records.push(record);
    }
}

// ---------------------------------------------------------------------------
// Projectile tracing
// ---------------------------------------------------------------------------

/// Decides which entity, if any, a shot hits.
pub trait ShotTracer {
    fn trace(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        range: f32,
        candidates: &[ActorView],
    ) -> Option<EntityId>;
}

/// Instant hit on the nearest candidate inside a cone.
#[derive(Debug, Clone, Copy)]
pub struct ConeTracer {
    pub half_angle_deg: f32,
}

impl Default for ConeTracer {
    fn default() -> Self {
        Self {
            half_angle_deg: 20.0,
        }
    }
}

impl ShotTracer for ConeTracer {
    fn trace(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        range: f32,
        candidates: &[ActorView],
    ) -> Option<EntityId> {
        let cos_limit = self.half_angle_deg.to_radians().cos();
        let direction = direction.try_normalize()?;
        candidates
            .iter()
            .filter_map(|c| {
                let to = c.position - origin;
                let distance = to.length();
                if distance > range {
                    return None;
                }
                // Point blank always connects.
                if distance <= f32::EPSILON {
                    return Some((c.id, 0.0));
                }
                (to.dot(direction) / distance >= cos_limit).then_some((c.id, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Every collaborator a session talks to.
pub struct Collaborators {
    pub spawner: Box<dyn Spawner>,
    pub ui: Box<dyn MatchUi>,
    pub results: Box<dyn ResultSink>,
    pub tracer: Box<dyn ShotTracer>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            spawner: Box::new(PoolSpawner::new()),
            ui: Box::new(TracingUi),
            results: Box::new(CollectingSink::default()),
            tracer: Box::new(ConeTracer::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_net::NodeId;

    fn view(n: u32, position: Vec3) -> ActorView {
        ActorView {
            id: EntityId::compose(NodeId(0), n),
            team: 1,
            position,
            alive: true,
        }
    }

    #[test]
    fn test_cone_tracer_picks_nearest_in_cone() {
        let mut tracer = ConeTracer::default();
        let candidates = [
            view(1, Vec3::new(0.0, 0.0, 8.0)),
            view(2, Vec3::new(0.5, 0.0, 4.0)),
            view(3, Vec3::new(5.0, 0.0, 1.0)),
        ];
        let hit = tracer.trace(Vec3::ZERO, Vec3::Z, 10.0, &candidates);
        assert_eq!(hit, Some(candidates[1].id));
        assert_eq!(tracer.trace(Vec3::ZERO, Vec3::Z, 3.0, &candidates), None);
        assert_eq!(tracer.trace(Vec3::ZERO, -Vec3::Z, 10.0, &candidates), None);
    }

    #[test]
    fn test_pool_tracks_live_handles() {
        let mut pool = PoolSpawner::new();
        let a = pool.spawn(PrefabKind::Combatant { team: 0 }, Vec3::ZERO);
        pool.spawn(
            PrefabKind::Projectile {
                skill_index: 0,
                direction: Vec3::Z,
            },
            Vec3::ZERO,
        );
        assert_eq!(pool.live(), 1);
        assert_eq!(pool.projectiles(), 1);
        pool.release(a);
        pool.release(a);
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn test_result_record_json() {
        let record = MatchResultRecord {
            player: EntityId::compose(NodeId(1), 2),
            team: 1,
            won: true,
            placement: 1,
            kills: 3,
            gold: 130,
            xp: 260,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kills"], 3);
        assert_eq!(json["won"], true);
    }
}
