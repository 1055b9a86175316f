//! Damage formula and the authority-gated hit path.
//!
//! [`CombatResolver::resolve_hit`] is the single entry point for every kind
//! of damage: projectile hits, damage-over-time ticks and safe-zone ticks.
//! On the authority it runs the formula, consults the target's
//! [`HitDedupCache`](crate::hit_dedup::HitDedupCache) and mutates health.
//! Anywhere else it forwards the hit to the authority as a `RequestDamage`
//! command and leaves local state alone.

use skirmish_config::{CombatConfig, Element};
use skirmish_net::{Audience, Command, CommandBus, EntityId, HealthChanged, RequestDamage};

use crate::entity::{Combatant, EntityRegistry};
use crate::hit_dedup::HitKey;

// ---------------------------------------------------------------------------
// Type advantage
// ---------------------------------------------------------------------------

/// Whether `attacker` has the advantage over `defender`.
pub fn beats(attacker: Element, defender: Element) -> bool {
    matches!(
        (attacker, defender),
        (Element::Fire, Element::Nature)
            | (Element::Water, Element::Fire)
            | (Element::Nature, Element::Water)
            | (Element::Light, Element::Dark)
            | (Element::Dark, Element::Light)
    )
}

/// Multiplier applied for `attacker` element hitting a `defender` element.
pub fn type_multiplier(attacker: Element, defender: Element, config: &CombatConfig) -> f32 {
    if beats(attacker, defender) {
        config.advantage_multiplier
    } else if beats(defender, attacker) {
        config.disadvantage_multiplier
    } else {
        1.0
    }
}

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

/// One damage attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRequest {
    pub attacker: EntityId,
    pub target: EntityId,
    /// Damage before type advantage and mitigation.
    pub base_damage: f32,
    pub critical: bool,
    pub hit_id: u64,
    pub element: Element,
    /// Fraction of applied damage healed back to the attacker.
    pub life_steal: f32,
    /// Skip the target's defense (boundary damage).
    pub pierce_defense: bool,
}

impl HitRequest {
    pub fn new(attacker: EntityId, target: EntityId, base_damage: f32, hit_id: u64) -> Self {
        Self {
            attacker,
            target,
            base_damage,
            critical: false,
            hit_id,
            element: Element::Neutral,
            life_steal: 0.0,
            pierce_defense: false,
        }
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn element(mut self, element: Element) -> Self {
        self.element = element;
        self
    }

    pub fn life_steal(mut self, fraction: f32) -> Self {
        self.life_steal = fraction;
        self
    }

    pub fn piercing(mut self) -> Self {
        self.pierce_defense = true;
        self
    }

    pub fn key(&self) -> HitKey {
        HitKey::new(self.attacker, self.hit_id)
    }

    fn to_command(&self) -> Command {
        Command::RequestDamage(RequestDamage {
            target: self.target,
            attacker: self.attacker,
            hit_id: self.hit_id,
            amount: self.base_damage,
            critical: self.critical,
            element: self.element,
            life_steal: self.life_steal,
        })
    }

    /// Rebuild a request received from the bus.
    pub fn from_command(request: &RequestDamage) -> Self {
        Self {
            attacker: request.attacker,
            target: request.target,
            base_damage: request.amount,
            critical: request.critical,
            hit_id: request.hit_id,
            element: request.element,
            life_steal: request.life_steal,
            pierce_defense: false,
        }
    }
}

/// What happened to a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitStatus {
    /// Health was mutated.
    Applied,
    /// The key was already applied; nothing changed.
    Duplicate,
    /// The target is already dead; nothing changed.
    TargetDead,
    /// The target id is unknown on this node.
    UnknownTarget,
    /// The attacker id is unknown on this node, so no hit id could be minted.
    UnknownAttacker,
    /// Sent to the authority; nothing changed locally.
    Forwarded,
}

/// Result of [`CombatResolver::resolve_hit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub status: HitStatus,
    /// Health actually removed.
    pub damage: f32,
    /// Target health after the hit (as known locally).
    pub health: f32,
    /// This hit moved the target from alive to dead.
    pub died: bool,
    /// Health restored to the attacker by life-steal.
    pub healed: f32,
}

impl DamageOutcome {
    pub(crate) fn unchanged(status: HitStatus, health: f32) -> Self {
        Self {
            status,
            damage: 0.0,
            health,
            died: false,
            healed: 0.0,
        }
    }

    pub fn applied(&self) -> bool {
        self.status == HitStatus::Applied
    }
}

// ---------------------------------------------------------------------------
// CombatResolver
// ---------------------------------------------------------------------------

/// Runs the damage formula and applies hits exactly once.
#[derive(Debug, Clone)]
pub struct CombatResolver {
    config: CombatConfig,
}

impl CombatResolver {
    pub fn new(config: CombatConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// `base × crit × type advantage − defense`, floored at the minimum.
    pub fn compute_damage(&self, request: &HitRequest, target: &Combatant) -> f32 {
        let mut raw = request.base_damage;
        if request.critical {
            raw *= self.config.crit_multiplier;
        }
        raw *= type_multiplier(request.element, target.element, &self.config);
        if !request.pierce_defense {
            raw -= target.defense;
        }
        raw.max(self.config.min_damage)
    }

    /// Resolve a hit from this node.
    ///
    /// The authority applies it and broadcasts the resulting health; any other
    /// node forwards it with `AuthorityOnly` and returns
    /// [`HitStatus::Forwarded`].
    pub fn resolve_hit(
        &self,
        registry: &mut EntityRegistry,
        bus: &mut CommandBus,
        request: &HitRequest,
        now: f64,
    ) -> DamageOutcome {
        if !bus.is_authority() {
            bus.invoke(request.to_command(), Audience::AuthorityOnly);
            let health = registry.combatant(request.target).map_or(0.0, |c| c.health);
            return DamageOutcome::unchanged(HitStatus::Forwarded, health);
        }

        let outcome = self.apply(registry, request, now);
        if outcome.applied() {
            broadcast_health(registry, bus, request.target);
            if outcome.healed > 0.0 {
                broadcast_health(registry, bus, request.attacker);
            }
        }
        outcome
    }

    /// Apply a hit to local state. Only the authority calls this.
    pub fn apply(&self, registry: &mut EntityRegistry, request: &HitRequest, now: f64) -> DamageOutcome {
        let Some(target) = registry.combatant(request.target) else {
            tracing::debug!("Hit {:?} on unknown target {}", request.key(), request.target);
            return DamageOutcome::unchanged(HitStatus::UnknownTarget, 0.0);
        };
        let damage = self.compute_damage(request, target);

        let accepted = registry
            .hit_ledger_mut(request.target)
            .is_some_and(|ledger| ledger.try_accept(request.key(), now));
        if !accepted {
            let health = registry.combatant(request.target).map_or(0.0, |c| c.health);
            tracing::trace!("Duplicate hit {:?} on {}", request.key(), request.target);
            return DamageOutcome::unchanged(HitStatus::Duplicate, health);
        }

        let Some(target) = registry.combatant_mut(request.target) else {
            return DamageOutcome::unchanged(HitStatus::UnknownTarget, 0.0);
        };
        if !target.alive {
            tracing::trace!("Hit {:?} on dead {}", request.key(), request.target);
            return DamageOutcome::unchanged(HitStatus::TargetDead, target.health);
        }

        let removed = damage.min(target.health);
        target.health -= removed;
        target.revision += 1;
        let died = target.health <= 0.0;
        if died {
            target.health = 0.0;
            target.alive = false;
            target.deaths += 1;
        }
        let health = target.health;

        let healed = if request.life_steal > 0.0 && removed > 0.0 {
            heal(registry, request.attacker, removed * request.life_steal)
        } else {
            0.0
        };

        DamageOutcome {
            status: HitStatus::Applied,
            damage: removed,
            health,
            died,
            healed,
        }
    }
}

impl Default for CombatResolver {
    fn default() -> Self {
        Self::new(CombatConfig::default())
    }
}

/// Heal a living entity, capped at max health. Returns the amount restored.
pub fn heal(registry: &mut EntityRegistry, id: EntityId, amount: f32) -> f32 {
    let Some(entity) = registry.combatant_mut(id) else {
        return 0.0;
    };
    if !entity.alive {
        return 0.0;
    }
    let restored = amount.min(entity.max_health - entity.health).max(0.0);
    if restored > 0.0 {
        entity.health += restored;
        entity.revision += 1;
    }
    restored
}

/// Publish an entity's authoritative health to every observer.
pub fn broadcast_health(registry: &EntityRegistry, bus: &mut CommandBus, id: EntityId) {
    if let Some(entity) = registry.combatant(id) {
        bus.invoke(
            Command::HealthChanged(HealthChanged {
                id,
                health: entity.health,
                alive: entity.alive,
                revision: entity.revision,
            }),
            Audience::AllExceptSender,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::CombatantSpec;
    use skirmish_net::{LinkFaults, NodeId, channel_mesh};

    fn setup() -> (EntityRegistry, EntityId, EntityId) {
        let mut reg = EntityRegistry::new(NodeId(0), 3.0);
        let attacker = reg.spawn(&CombatantSpec::new(0, NodeId(0), 100.0), None);
        let target = reg.spawn(&CombatantSpec::new(1, NodeId(0), 100.0).with_defense(2.0), None);
        (reg, attacker, target)
    }

    fn authority_bus() -> (CommandBus, CommandBus) {
        let nodes = [NodeId(0), NodeId(1)];
        let mut mesh = channel_mesh(&nodes, LinkFaults::default());
        let observer = mesh.pop().unwrap();
        let authority = mesh.pop().unwrap();
        (
            CommandBus::new(NodeId(0), NodeId(0), nodes.to_vec(), Box::new(authority)),
            CommandBus::new(NodeId(1), NodeId(0), nodes.to_vec(), Box::new(observer)),
        )
    }

    #[test]
    fn test_type_advantage_table() {
        let config = CombatConfig::default();
        assert_eq!(type_multiplier(Element::Fire, Element::Nature, &config), 1.5);
        assert_eq!(type_multiplier(Element::Nature, Element::Fire, &config), 0.75);
        assert_eq!(type_multiplier(Element::Light, Element::Dark, &config), 1.5);
        assert_eq!(type_multiplier(Element::Dark, Element::Light, &config), 1.5);
        assert_eq!(type_multiplier(Element::Fire, Element::Fire, &config), 1.0);
        assert_eq!(type_multiplier(Element::Neutral, Element::Water, &config), 1.0);
    }

    #[test]
    fn test_formula_with_mitigation_and_floor() {
        let resolver = CombatResolver::default();
        let (reg, attacker, target) = setup();
        let defender = reg.combatant(target).unwrap();

        let plain = HitRequest::new(attacker, target, 10.0, 1);
        assert_eq!(resolver.compute_damage(&plain, defender), 8.0);

        let crit = plain.clone().critical(true);
        assert_eq!(resolver.compute_damage(&crit, defender), 13.0);

        let tiny = HitRequest::new(attacker, target, 1.0, 2);
        assert_eq!(resolver.compute_damage(&tiny, defender), 1.0);

        let pierce = HitRequest::new(attacker, target, 1.0, 3).piercing();
        assert_eq!(resolver.compute_damage(&pierce, defender), 1.0);
        let pierce = HitRequest::new(attacker, target, 5.0, 4).piercing();
        assert_eq!(resolver.compute_damage(&pierce, defender), 5.0);
    }

    #[test]
    fn test_same_key_applies_once() {
        let resolver = CombatResolver::default();
        let (mut reg, attacker, target) = setup();
        let request = HitRequest::new(attacker, target, 10.0, 1);

        let first = resolver.apply(&mut reg, &request, 0.0);
        assert_eq!(first.status, HitStatus::Applied);
        assert_eq!(first.health, 92.0);
        for t in 1..5 {
            let again = resolver.apply(&mut reg, &request, t as f64 * 0.5);
            assert_eq!(again.status, HitStatus::Duplicate);
            assert_eq!(again.health, 92.0);
        }
        assert_eq!(reg.combatant(target).unwrap().health, 92.0);
    }

    #[test]
    fn test_death_transitions_once() {
        let resolver = CombatResolver::default();
        let (mut reg, attacker, target) = setup();

        let lethal = resolver.apply(&mut reg, &HitRequest::new(attacker, target, 500.0, 1), 0.0);
        assert!(lethal.died);
        assert_eq!(lethal.damage, 100.0);
        assert_eq!(lethal.health, 0.0);

        let after = resolver.apply(&mut reg, &HitRequest::new(attacker, target, 500.0, 2), 0.1);
        assert_eq!(after.status, HitStatus::TargetDead);
        assert!(!after.died);
        assert_eq!(reg.combatant(target).unwrap().deaths, 1);
    }

    #[test]
    fn test_unknown_target_is_noop() {
        let resolver = CombatResolver::default();
        let (mut reg, attacker, _) = setup();
        let ghost = EntityId::compose(NodeId(3), 1);
        let outcome = resolver.apply(&mut reg, &HitRequest::new(attacker, ghost, 10.0, 1), 0.0);
        assert_eq!(outcome.status, HitStatus::UnknownTarget);
    }

    #[test]
    fn test_life_steal_heals_attacker_capped() {
        let resolver = CombatResolver::default();
        let (mut reg, attacker, target) = setup();
        reg.combatant_mut(attacker).unwrap().health = 95.0;

        let request = HitRequest::new(attacker, target, 22.0, 1).life_steal(0.5);
        let outcome = resolver.apply(&mut reg, &request, 0.0);
        assert_eq!(outcome.damage, 20.0);
        assert_eq!(outcome.healed, 5.0);
        assert_eq!(reg.combatant(attacker).unwrap().health, 100.0);
    }

    #[test]
    fn test_observer_forwards_to_authority() {
        let resolver = CombatResolver::default();
        let (mut auth_bus, mut obs_bus) = authority_bus();
        let (mut reg, attacker, target) = setup();

        let outcome = resolver.resolve_hit(
            &mut reg,
            &mut obs_bus,
            &HitRequest::new(attacker, target, 10.0, 1),
            0.0,
        );
        assert_eq!(outcome.status, HitStatus::Forwarded);
        assert_eq!(reg.combatant(target).unwrap().health, 100.0);

        let inbound = auth_bus.drain();
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].audience, Audience::AuthorityOnly);
        assert!(matches!(inbound[0].command, Command::RequestDamage(_)));
    }

    #[test]
    fn test_authority_broadcasts_health() {
        let resolver = CombatResolver::default();
        let (mut auth_bus, mut obs_bus) = authority_bus();
        let (mut reg, attacker, target) = setup();

        let outcome = resolver.resolve_hit(
            &mut reg,
            &mut auth_bus,
            &HitRequest::new(attacker, target, 10.0, 1),
            0.0,
        );
        assert!(outcome.applied());
        let inbound = obs_bus.drain();
        assert_eq!(inbound.len(), 1);
        match &inbound[0].command {
            Command::HealthChanged(h) => {
                assert_eq!(h.id, target);
                assert_eq!(h.health, 92.0);
                assert_eq!(h.revision, 1);
            }
            other => panic!("expected HealthChanged, got {other:?}"),
        }
    }
}
