//! Bot roster and steering for headless matches.
//!
//! Bots spawn on a ring around the arena center, one arc per team, and are
//! handed out to nodes round-robin so every node controls someone. Each tick
//! a living bot walks toward its nearest enemy until it is inside skill range,
//! and back toward the center while the safe zone is shrinking around it.

use glam::{Vec2, Vec3};
use skirmish_config::{BotConfig, MatchConfig};
use skirmish_match::{ActorView, CombatantSpec, Session, nearest_enemy};
use skirmish_net::{EntityId, NodeId};

/// Distance at which a bot stops closing in.
const ENGAGE_DISTANCE: f32 = 6.0;

/// Spawn positions on a ring of `radius`, grouped by team.
pub fn spawn_ring(team_count: u8, players_per_team: u8, radius: f32) -> Vec<(u8, Vec3)> {
    let total = usize::from(team_count) * usize::from(players_per_team);
    if total == 0 {
        return Vec::new();
    }
    let step = std::f32::consts::TAU / total as f32;
    (0..team_count)
        .flat_map(|team| (0..players_per_team).map(move |slot| (team, slot)))
        .enumerate()
        .map(|(i, (team, _))| {
            let angle = step * i as f32;
            (team, Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius))
        })
        .collect()
}

/// Spawn every bot on the authority. Controllers rotate over `nodes`.
pub fn spawn_bots(
    authority: &mut Session,
    game: &MatchConfig,
    bots: &BotConfig,
    nodes: &[NodeId],
) -> Vec<EntityId> {
    let ring = spawn_ring(game.team_count, game.players_per_team, bots.spawn_radius);
    let mut ids = Vec::with_capacity(ring.len());
    for (i, (team, position)) in ring.into_iter().enumerate() {
        let controller = nodes.get(i % nodes.len().max(1)).copied().unwrap_or(NodeId(0));
        let spec = CombatantSpec::new(team, controller, bots.max_health)
            .with_defense(bots.defense)
            .at(position);
        if let Some(id) = authority.spawn_combatant(spec) {
            ids.push(id);
        }
    }
    tracing::info!("Spawned {} bots over {} nodes", ids.len(), nodes.len());
    ids
}

/// Where `bot` wants to be one step from now.
pub fn steer(
    bot: &ActorView,
    views: &[ActorView],
    zone: Option<(Vec2, f32)>,
    speed: f32,
    dt: f32,
) -> Vec3 {
    let max_step = speed * dt;

    if let Some((center, radius)) = zone {
        let ground = Vec2::new(bot.position.x, bot.position.z);
        if ground.distance(center) > radius * 0.9 {
            let toward = (center - ground).normalize_or_zero() * max_step;
            return bot.position + Vec3::new(toward.x, 0.0, toward.y);
        }
    }

    let Some(target) = nearest_enemy(bot, views) else {
        return bot.position;
    };
    let offset = target.position - bot.position;
    let distance = offset.length();
    if distance <= ENGAGE_DISTANCE {
        return bot.position;
    }
    bot.position + offset / distance * max_step.min(distance - ENGAGE_DISTANCE)
}

/// Move every living bot on the authority.
pub fn steer_all(authority: &mut Session, speed: f32, dt: f32) {
    let views = authority.registry().actor_views();
    let zone = authority.zone().map(|z| (z.center(), z.radius()));
    for bot in views.iter().filter(|v| v.alive) {
        let next = steer(bot, &views, zone, speed, dt);
        if next != bot.position {
            authority.set_position(bot.id, next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(n: u32, team: u8, position: Vec3) -> ActorView {
        ActorView {
            id: EntityId::compose(NodeId(0), n),
            team,
            position,
            alive: true,
        }
    }

    #[test]
    fn test_spawn_ring_covers_every_slot() {
        let ring = spawn_ring(3, 2, 10.0);
        assert_eq!(ring.len(), 6);
        assert_eq!(ring.iter().filter(|(team, _)| *team == 2).count(), 2);
        for (_, position) in &ring {
            assert!((position.length() - 10.0).abs() < 1e-4);
        }
        assert!(spawn_ring(0, 4, 10.0).is_empty());
    }

    #[test]
    fn test_steer_closes_to_engage_distance() {
        let bot = view(1, 0, Vec3::ZERO);
        let views = [bot, view(2, 1, Vec3::new(10.0, 0.0, 0.0))];
        let next = steer(&bot, &views, None, 3.0, 1.0);
        assert_eq!(next, Vec3::new(3.0, 0.0, 0.0));
        let next = steer(&bot, &views, None, 30.0, 1.0);
        assert_eq!(next, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_steer_heads_inside_the_zone_first() {
        let bot = view(1, 0, Vec3::new(50.0, 0.0, 0.0));
        let views = [bot, view(2, 1, Vec3::new(60.0, 0.0, 0.0))];
        let next = steer(&bot, &views, Some((Vec2::ZERO, 20.0)), 2.0, 1.0);
        assert_eq!(next, Vec3::new(48.0, 0.0, 0.0));
    }
}
