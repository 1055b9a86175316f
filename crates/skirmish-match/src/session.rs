//! The per-node session context.
//!
//! A [`Session`] owns everything one node knows about a match: its command
//! bus endpoint, the entity registry, the combat resolver, skill casters,
//! the scheduler and, on the authority, the match state machine and safe
//! zone. It is passed explicitly to every command handler; there is no
//! global state.
//!
//! Call [`Session::tick`] once per simulation step. It drains and dispatches
//! inbound commands, advances authority-only systems, then runs whatever
//! scheduled tasks came due.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use skirmish_config::{Config, Element, MatchConfig, MatchMode, RewardConfig, SkillConfig};
use skirmish_net::{
    AnnouncePlacement, AnnounceWinner, Audience, Command, CommandBus, CommandTable, DespawnEntity,
    EntityDied, EntityId, EntityRevived, MatchConfigured, NodeContext, NodeId, ReportKill,
    ScoreSnapshot, SpawnEntity, TeamScore, TimeLeft, ZoneUpdate,
};

use crate::collaborators::{Collaborators, EntityHandle, MatchResultRecord, PrefabKind};
use crate::combat::{CombatResolver, DamageOutcome, HitRequest, HitStatus};
use crate::entity::{ActorView, CombatantSpec, EntityRegistry};
use crate::match_state::{
    KillReport, MatchConfigError, MatchMirror, MatchOutcome, MatchStateMachine, team_placements,
};
use crate::safe_zone::SafeZone;
use crate::scheduler::Scheduler;
use crate::skill::{CastDescriptor, SkillCastCoordinator};

#[path = "session_handlers.rs"]
mod handlers;

/// Minimum simulated time between two zone broadcasts while shrinking.
const ZONE_BROADCAST_INTERVAL_SECS: f64 = 0.5;

// ---------------------------------------------------------------------------
// Errors and tasks
// ---------------------------------------------------------------------------

/// Why a match could not be configured.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchSetupError {
    #[error("only the authority configures the match")]
    NotAuthority,

    #[error("a match is already configured in this session")]
    AlreadyConfigured,

    #[error(transparent)]
    Invalid(#[from] MatchConfigError),
}

/// Deferred work, owned by an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionTask {
    /// One shot of a skill wave.
    WaveShot {
        actor: EntityId,
        skill_index: u8,
        direction: Vec3,
    },
    /// One damage-over-time tick. Owned by the target.
    DotTick {
        attacker: EntityId,
        target: EntityId,
        damage: f32,
        element: Element,
        ticks_left: u32,
        interval: f64,
    },
    /// Bring a dead entity back.
    Revive { entity: EntityId },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything one node knows about the match.
pub struct Session {
    bus: CommandBus,
    table: Arc<CommandTable<Session>>,
    registry: EntityRegistry,
    resolver: CombatResolver,
    skills: SkillCastCoordinator,
    scheduler: Scheduler<SessionTask>,
    game: Option<MatchStateMachine>,
    mirror: MatchMirror,
    zone: Option<SafeZone>,
    last_zone_broadcast: f64,
    rewards: RewardConfig,
    respawn_delay: f64,
    now: f64,
    env_hits: u64,
    next_report: u64,
    next_score_request: u64,
    // Dedup keys below live as long as the session, which spans one match.
    seen_reports: FxHashSet<(NodeId, u64)>,
    seen_score_requests: FxHashSet<(NodeId, u64)>,
    seen_deaths: FxHashSet<(EntityId, u32)>,
    kills: FxHashMap<EntityId, u32>,
    handles: FxHashMap<EntityId, EntityHandle>,
    submitted: FxHashSet<EntityId>,
    collab: Collaborators,
}

impl NodeContext for Session {
    fn is_authority(&self) -> bool {
        self.bus.is_authority()
    }
}

impl Session {
    /// Build a node context around a bus endpoint.
    pub fn new(config: &Config, bus: CommandBus, collab: Collaborators) -> Self {
        let loadout = if config.skills.is_empty() {
            SkillConfig::default_loadout()
        } else {
            config.skills.clone()
        };
        let table = handlers::command_table();
        tracing::debug!(
            "{} session with {} routes, authority {}",
            bus.local_node(),
            table.registered_tags().count(),
            bus.authority_node()
        );
        Self {
            registry: EntityRegistry::new(bus.local_node(), config.combat.hit_dedup_ttl_secs),
            bus,
            table: Arc::new(table),
            resolver: CombatResolver::new(config.combat.clone()),
            skills: SkillCastCoordinator::new(loadout),
            scheduler: Scheduler::new(),
            game: None,
            mirror: MatchMirror::new(),
            zone: None,
            last_zone_broadcast: f64::NEG_INFINITY,
            rewards: config.rewards.clone(),
            respawn_delay: config.combat.respawn_delay_secs,
            now: 0.0,
            env_hits: 0,
            next_report: 0,
            next_score_request: 0,
            seen_reports: FxHashSet::default(),
            seen_score_requests: FxHashSet::default(),
            seen_deaths: FxHashSet::default(),
            kills: FxHashMap::default(),
            handles: FxHashMap::default(),
            submitted: FxHashSet::default(),
            collab,
        }
    }

    // --- Accessors ---

    pub fn local_node(&self) -> NodeId {
        self.bus.local_node()
    }

    /// Simulated seconds since the session started.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn mirror(&self) -> &MatchMirror {
        &self.mirror
    }

    /// The match state machine (authority only).
    pub fn match_state(&self) -> Option<&MatchStateMachine> {
        self.game.as_ref()
    }

    /// The live safe zone (authority, Battle-Royale only).
    pub fn zone(&self) -> Option<&SafeZone> {
        self.zone.as_ref()
    }

    pub fn scheduler(&self) -> &Scheduler<SessionTask> {
        &self.scheduler
    }

    pub fn skills(&self) -> &SkillCastCoordinator {
        &self.skills
    }

    /// Kills credited to `id` as seen by this node.
    pub fn kills(&self, id: EntityId) -> u32 {
        self.kills.get(&id).copied().unwrap_or(0)
    }

    /// Whether the final result has been announced to this node.
    pub fn is_finished(&self) -> bool {
        self.mirror.result().is_some()
    }

    // --- Bus helpers ---

    /// Invoke a command on the audience its route is registered with.
    fn broadcast(&mut self, command: Command) {
        let tag = command.tag();
        match self.table.audience(tag) {
            Some(audience) => {
                self.bus.invoke(command, audience);
            }
            None => tracing::warn!("No route registered for {:?}, not sent", tag),
        }
    }

    /// Drain the bus and dispatch everything received. Returns the number of
    /// envelopes processed.
    pub fn pump(&mut self) -> usize {
        let table = Arc::clone(&self.table);
        let envelopes = self.bus.drain();
        for envelope in &envelopes {
            table.dispatch(self, envelope);
        }
        envelopes.len()
    }

    // --- Entities ---

    /// Spawn a combatant and replicate it. Authority only.
    pub fn spawn_combatant(&mut self, spec: CombatantSpec) -> Option<EntityId> {
        if !self.is_authority() {
            tracing::debug!("{} cannot spawn, not the authority", self.local_node());
            return None;
        }
        let id = self.registry.spawn(&spec, Some(self.skills.new_caster()));
        let handle = self
            .collab
            .spawner
            .spawn(PrefabKind::Combatant { team: spec.team }, spec.position);
        self.handles.insert(id, handle);
        self.broadcast(Command::SpawnEntity(SpawnEntity {
            id,
            team: spec.team,
            controller: spec.controller,
            health: spec.max_health,
            max_health: spec.max_health,
            defense: spec.defense,
            element: spec.element,
            position: spec.position.to_array(),
        }));
        Some(id)
    }

    /// Despawn a combatant everywhere. Authority only.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if !self.is_authority() || !self.remove_local(id) {
            return false;
        }
        self.broadcast(Command::DespawnEntity(DespawnEntity { id }));
        true
    }

    /// Drop an entity from this node, cancelling everything it owns.
    fn remove_local(&mut self, id: EntityId) -> bool {
        if !self.registry.despawn(id) {
            return false;
        }
        let cancelled = self.scheduler.cancel_owner(id);
        if cancelled > 0 {
            tracing::trace!("Cancelled {} pending tasks of {}", cancelled, id);
        }
        if let Some(handle) = self.handles.remove(&id) {
            self.collab.spawner.release(handle);
        }
        true
    }

    /// Move an entity (driven by input or AI).
    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> bool {
        self.registry.set_position(id, position)
    }

    // --- Combat ---

    /// A hit decided by this node's input or AI layer. Mints a hit id for
    /// `attacker` and resolves it (locally on the authority, forwarded
    /// anywhere else).
    pub fn request_hit(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        base_damage: f32,
        critical: bool,
        element: Element,
    ) -> DamageOutcome {
        let Some(hit_id) = self.registry.mint_hit_id(attacker) else {
            tracing::debug!("Hit from unknown attacker {}", attacker);
            return DamageOutcome::unchanged(HitStatus::UnknownAttacker, 0.0);
        };
        let request = HitRequest::new(attacker, target, base_damage, hit_id)
            .critical(critical)
            .element(element);
        self.resolve_hit(&request)
    }

    /// Resolve a fully formed hit. Deaths are processed here on the authority.
    pub fn resolve_hit(&mut self, request: &HitRequest) -> DamageOutcome {
        let outcome = self
            .resolver
            .resolve_hit(&mut self.registry, &mut self.bus, request, self.now);
        if outcome.died {
            let killer = Some(request.attacker).filter(|a| *a != EntityId::ENVIRONMENT);
            self.on_death(request.target, killer);
        }
        outcome
    }

    /// Authority bookkeeping for an entity that just died.
    fn on_death(&mut self, victim: EntityId, killer: Option<EntityId>) {
        let Some(dead) = self.registry.combatant(victim) else {
            return;
        };
        let (victim_team, death_count) = (dead.team, dead.deaths);

        self.scheduler.cancel_owner(victim);
        if let Some(caster) = self.registry.caster_mut(victim) {
            caster.interrupt();
        }
        self.broadcast(Command::EntityDied(EntityDied {
            victim,
            killer,
            death_count,
        }));

        let killer_team = killer
            .and_then(|k| self.registry.combatant(k))
            .map(|k| k.team)
            .filter(|team| *team != victim_team);
        match killer_team {
            Some(team) => {
                self.apply_kill(team);
            }
            None => self.apply_elimination(),
        }

        if self.revives_enabled() {
            self.scheduler
                .schedule(victim, self.now + self.respawn_delay, SessionTask::Revive {
                    entity: victim,
                });
        }
    }

    fn match_running(&self) -> bool {
        self.game.as_ref().is_some_and(MatchStateMachine::is_running)
    }

    /// Team-Deathmatch and Arena bring the dead back; Battle-Royale does not.
    fn revives_enabled(&self) -> bool {
        self.match_running()
            && self
                .game
                .as_ref()
                .is_some_and(|g| g.mode() != MatchMode::BattleRoyale)
    }

    fn revive(&mut self, id: EntityId) {
        if !self.revives_enabled() {
            return;
        }
        let Some(entity) = self.registry.combatant_mut(id) else {
            return;
        };
        if entity.alive {
            return;
        }
        entity.alive = true;
        entity.health = entity.max_health;
        entity.revision += 1;
        let (health, revision) = (entity.health, entity.revision);
        let position = self.registry.position(id).unwrap_or(Vec3::ZERO);
        tracing::debug!("{} revived", id);
        self.broadcast(Command::EntityRevived(EntityRevived {
            id,
            health,
            position: position.to_array(),
            revision,
        }));
    }

    // --- Scoring ---

    /// Credit a kill to `killer_team`. Applied directly on the authority
    /// (returning the report); forwarded `AuthorityOnly` elsewhere (`None`).
    pub fn report_kill(&mut self, killer_team: u8) -> Option<KillReport> {
        if self.is_authority() {
            return Some(self.apply_kill(killer_team));
        }
        self.next_report += 1;
        self.broadcast(Command::ReportKill(ReportKill {
            killer_team,
            report_id: self.next_report,
        }));
        None
    }

    /// Add to a team's score. Forwarded to the authority from observers.
    /// `None` when the match is not running, the team is unknown or the
    /// score would overflow.
    pub fn add_team_score(&mut self, team: u8, delta: i32) -> Option<i32> {
        if !self.is_authority() {
            self.next_score_request += 1;
            self.broadcast(Command::AddTeamScore(TeamScore {
                team,
                value: delta,
                request_id: self.next_score_request,
            }));
            return None;
        }
        let score = self.game.as_mut()?.add_team_score(team, delta)?;
        self.publish_score(team, score);
        Some(score)
    }

    fn apply_kill(&mut self, killer_team: u8) -> KillReport {
        let alive = self.registry.alive_teams();
        let Some(game) = self.game.as_mut() else {
            return KillReport::Ignored;
        };
        let report = game.report_kill(killer_team, &alive);
        if let KillReport::Scored {
            team,
            score,
            outcome,
        } = &report
        {
            self.publish_score(*team, *score);
            if let Some(outcome) = outcome {
                self.finish(outcome.clone());
            }
        }
        report
    }

    fn apply_elimination(&mut self) {
        let alive = self.registry.alive_teams();
        let outcome = self
            .game
            .as_mut()
            .and_then(|game| game.report_elimination(&alive));
        if let Some(outcome) = outcome {
            self.finish(outcome);
        }
    }

    fn publish_score(&mut self, team: u8, value: i32) {
        let Some(revision) = self.game.as_ref().map(|g| g.ledger().revision()) else {
            return;
        };
        self.mirror.apply_score(team, value, revision);
        self.broadcast(Command::SetTeamScore(ScoreSnapshot {
            team,
            value,
            revision,
        }));
    }

    // --- Match lifecycle ---

    /// Configure the match. Authority only, once per session.
    pub fn initialize_match(&mut self, config: MatchConfig) -> Result<(), MatchSetupError> {
        if !self.is_authority() {
            return Err(MatchSetupError::NotAuthority);
        }
        if self.game.is_some() {
            return Err(MatchSetupError::AlreadyConfigured);
        }
        let game = MatchStateMachine::initialize_from(config)?;
        let (mode, team_count) = (game.mode(), game.config().team_count);
        if mode == MatchMode::BattleRoyale {
            self.zone = Some(SafeZone::from_config(&game.config().zone));
        }
        self.game = Some(game);

        self.mirror.configure(mode, team_count);
        self.broadcast(Command::MatchConfigured(MatchConfigured { mode, team_count }));
        self.publish_zone();
        tracing::info!("Match configured: {:?} with {} teams", mode, team_count);
        Ok(())
    }

    /// Teams are assigned: start the match.
    pub fn mark_teams_assigned_and_ready(&mut self) -> bool {
        let Some(game) = self.game.as_mut() else {
            return false;
        };
        if !game.mark_teams_assigned_and_ready() {
            return false;
        }
        let time_left = game.time_left();
        self.mirror.start();
        self.broadcast(Command::MatchStarted);
        if let Some(secs) = time_left {
            self.publish_time_left(secs);
        }
        true
    }

    /// End the match now with an explicit winner.
    pub fn end_match_with_winner(&mut self, winner: Option<u8>) -> Option<MatchOutcome> {
        let outcome = self.game.as_mut()?.end_match_with_winner(winner)?;
        self.finish(outcome.clone());
        Some(outcome)
    }

    /// Tear down timers and announce the result.
    fn finish(&mut self, outcome: MatchOutcome) {
        let cancelled = self.scheduler.cancel_all();
        tracing::debug!("Match over, cancelled {} pending tasks", cancelled);
        for id in self.registry.ids() {
            if let Some(caster) = self.registry.caster_mut(id) {
                caster.interrupt();
            }
        }
        self.zone = None;

        self.broadcast(Command::AnnounceWinner(AnnounceWinner {
            mode: outcome.mode,
            winner: outcome.winner,
            scores: outcome.scores.clone(),
        }));

        if outcome.mode == MatchMode::BattleRoyale {
            for id in self.registry.ids() {
                let Some(entity) = self.registry.combatant(id) else {
                    continue;
                };
                let (team, controller) = (entity.team, entity.controller);
                let placement = outcome.placement(team).unwrap_or(u32::MAX);
                self.bus.invoke(
                    Command::AnnouncePlacement(AnnouncePlacement {
                        player: id,
                        team,
                        placement,
                    }),
                    Audience::Node(controller),
                );
            }
        }
    }

    // --- Tick ---

    /// Advance this node by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        self.now += dt;
        self.pump();
        if self.is_authority() {
            self.step_authority(dt);
        }
        self.run_due_tasks();
    }

    fn step_authority(&mut self, dt: f64) {
        let countdown = match self.game.as_mut() {
            Some(game) if game.is_running() => game.tick(dt),
            _ => return,
        };
        if let Some(countdown) = countdown {
            self.publish_time_left(countdown.time_left);
            if let Some(outcome) = countdown.outcome {
                self.finish(outcome);
                return;
            }
        }

        for cast in self.skills.update(&mut self.registry, dt as f32) {
            self.broadcast(cast.to_command());
            self.schedule_shots(&cast, false);
        }

        self.step_zone(dt);
    }

    fn schedule_shots(&mut self, cast: &CastDescriptor, remote: bool) {
        let shots = if remote {
            self.skills.execute_remote(&mut self.registry, cast)
        } else {
            self.skills.plan(&self.registry, cast)
        };
        let Some(shots) = shots else {
            tracing::debug!("Cast of skill {} by unknown {}", cast.skill_index, cast.actor);
            return;
        };
        for shot in shots {
            self.scheduler.schedule(
                cast.actor,
                self.now + shot.delay,
                SessionTask::WaveShot {
                    actor: cast.actor,
                    skill_index: cast.skill_index,
                    direction: shot.direction,
                },
            );
        }
    }

    fn run_due_tasks(&mut self) {
        for task in self.scheduler.poll(self.now) {
            match task.payload {
                SessionTask::WaveShot {
                    actor,
                    skill_index,
                    direction,
                } => self.fire_shot(actor, skill_index, direction),
                SessionTask::DotTick {
                    attacker,
                    target,
                    damage,
                    element,
                    ticks_left,
                    interval,
                } => self.dot_tick(attacker, target, damage, element, ticks_left, interval),
                SessionTask::Revive { entity } => self.revive(entity),
            }
        }
    }

    fn fire_shot(&mut self, actor: EntityId, skill_index: u8, direction: Vec3) {
        let Some(shooter) = self.registry.combatant(actor).filter(|c| c.alive) else {
            return;
        };
        let team = shooter.team;
        let Some(skill) = self
            .registry
            .caster(actor)
            .and_then(|c| c.skill(skill_index))
            .cloned()
        else {
            return;
        };
        let origin = self.registry.position(actor).unwrap_or(Vec3::ZERO);

        self.collab.spawner.spawn(
            PrefabKind::Projectile {
                skill_index,
                direction,
            },
            origin,
        );
        if let Some(caster) = self.registry.caster_mut(actor) {
            caster.shot_fired();
        }

        if !self.is_authority() || !self.match_running() {
            return;
        }
        let candidates: Vec<ActorView> = self
            .registry
            .actor_views()
            .into_iter()
            .filter(|v| v.alive && v.team != team)
            .collect();
        let Some(target) = self
            .collab
            .tracer
            .trace(origin, direction, skill.range, &candidates)
        else {
            return;
        };
        let Some(hit_id) = self.registry.mint_hit_id(actor) else {
            return;
        };
        let request = HitRequest::new(actor, target, skill.base_damage, hit_id)
            .element(skill.element)
            .life_steal(skill.life_steal);
        let outcome = self.resolve_hit(&request);

        if let Some(dot) = skill.dot.filter(|_| outcome.applied() && !outcome.died) {
            self.scheduler.schedule(
                target,
                self.now + dot.interval_secs,
                SessionTask::DotTick {
                    attacker: actor,
                    target,
                    damage: dot.damage_per_tick,
                    element: skill.element,
                    ticks_left: dot.ticks,
                    interval: dot.interval_secs,
                },
            );
        }
    }

    fn dot_tick(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        damage: f32,
        element: Element,
        ticks_left: u32,
        interval: f64,
    ) {
        if !self.is_authority() || !self.match_running() {
            return;
        }
        let Some(hit_id) = self.registry.mint_hit_id(attacker) else {
            tracing::trace!("DOT on {} ends, {} is gone", target, attacker);
            return;
        };
        let request = HitRequest::new(attacker, target, damage, hit_id).element(element);
        let outcome = self.resolve_hit(&request);
        if outcome.applied() && !outcome.died && ticks_left > 1 {
            self.scheduler.schedule(
                target,
                self.now + interval,
                SessionTask::DotTick {
                    attacker,
                    target,
                    damage,
                    element,
                    ticks_left: ticks_left - 1,
                    interval,
                },
            );
        }
    }

    // --- Safe zone ---

    fn step_zone(&mut self, dt: f64) {
        let Some(zone) = self.zone.as_mut() else {
            return;
        };
        let step = zone.update(dt as f32);
        let settled = zone.is_settled();
        if step.radius_changed
            && (settled || self.now - self.last_zone_broadcast >= ZONE_BROADCAST_INTERVAL_SECS)
        {
            self.publish_zone();
        }
        for _ in 0..step.damage_ticks {
            if !self.apply_zone_damage() {
                break;
            }
        }
    }

    /// One boundary tick. Returns `false` once the zone is gone.
    fn apply_zone_damage(&mut self) -> bool {
        let Some(zone) = self.zone.as_ref() else {
            return false;
        };
        let damage = zone.tick_damage();
        let outside: Vec<EntityId> = self
            .registry
            .actor_views()
            .into_iter()
            .filter(|v| v.alive && zone.is_outside(v.position))
            .map(|v| v.id)
            .collect();
        for target in outside {
            if self.zone.is_none() {
                return false;
            }
            self.env_hits += 1;
            let request =
                HitRequest::new(EntityId::ENVIRONMENT, target, damage, self.env_hits).piercing();
            self.resolve_hit(&request);
        }
        self.zone.is_some()
    }

    fn publish_zone(&mut self) {
        let Some(zone) = self.zone.as_ref() else {
            return;
        };
        let (center, radius) = (zone.center(), zone.radius());
        self.last_zone_broadcast = self.now;
        self.apply_zone_update(center, radius);
        self.broadcast(Command::ZoneUpdate(ZoneUpdate {
            center: center.to_array(),
            radius,
        }));
    }

    fn publish_time_left(&mut self, secs: u32) {
        self.apply_time_left(secs);
        self.broadcast(Command::TimeLeft(TimeLeft { secs }));
    }

    // --- Mirror updates shared by handlers and the authority ---

    fn apply_zone_update(&mut self, center: Vec2, radius: f32) {
        if self.mirror.apply_zone(center, radius) {
            self.collab.ui.show_zone(center.to_array(), radius);
        }
    }

    fn apply_time_left(&mut self, secs: u32) {
        self.mirror.apply_time_left(secs);
        self.collab.ui.show_time_left(secs);
    }

    /// Hand one result record per locally controlled participant to the
    /// result sink, once the outcome (and in Battle-Royale, the placement)
    /// is known.
    fn submit_results(&mut self) {
        let Some(result) = self.mirror.result().cloned() else {
            return;
        };
        let placements = team_placements(&result.scores, result.winner);
        for id in self.registry.controlled_by(self.local_node()) {
            if self.submitted.contains(&id) {
                continue;
            }
            let Some(entity) = self.registry.combatant(id) else {
                continue;
            };
            let team = entity.team;
            let placement = if result.mode == MatchMode::BattleRoyale {
                match self.mirror.placement(id) {
                    Some(placement) => placement,
                    None => continue,
                }
            } else {
                placements.get(usize::from(team)).copied().unwrap_or(0)
            };
            let won = result.winner == Some(team);
            let kills = self.kills(id);
            let (gold, xp) = if won {
                (self.rewards.gold_win, self.rewards.xp_win)
            } else {
                (self.rewards.gold_loss, self.rewards.xp_loss)
            };
            self.collab.results.submit(MatchResultRecord {
                player: id,
                team,
                won,
                placement,
                kills,
                gold: gold + kills * self.rewards.gold_per_kill,
                xp: xp + kills * self.rewards.xp_per_kill,
            });
            self.submitted.insert(id);
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
