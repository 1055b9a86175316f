//! Damageable entities stored in an ECS arena.
//!
//! Each node keeps its own [`EntityRegistry`]: on the authority it is the
//! canonical state, on observers a read-mirror fed by replication commands.
//! Entities are addressed by their network [`EntityId`]; the registry maps
//! that to an ECS [`Entity`]. Despawning drops the mapping, so a stale id
//! simply resolves to `None`.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rustc_hash::FxHashMap;
use skirmish_config::Element;
use skirmish_net::{EntityId, NodeId};

use crate::hit_dedup::HitDedupCache;
use crate::skill::SkillCaster;

/// Bit offset of the minting node inside a hit id. Node ids must fit in the
/// remaining 24 bits and per-attacker counters in the low 40.
pub const HIT_ID_NODE_SHIFT: u32 = 40;

/// Largest node id that can mint hit ids.
pub const MAX_HIT_NODE: u32 = (1 << (64 - HIT_ID_NODE_SHIFT)) - 1;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Health, team and affinity of a damageable actor.
#[derive(Debug, Clone, PartialEq, Component)]
pub struct Combatant {
    /// Network id.
    pub id: EntityId,
    /// Team index.
    pub team: u8,
    /// Node whose player drives this entity and receives its placement.
    pub controller: NodeId,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
    /// Flat damage mitigation.
    pub defense: f32,
    pub element: Element,
    /// Bumped on every authoritative health change.
    pub revision: u32,
    /// Times this entity has died.
    pub deaths: u32,
}

/// World-space position.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Position(pub Vec3);

/// Hits already applied to this entity.
#[derive(Debug, Clone, Default, Component)]
pub struct HitLedger(pub HitDedupCache);

/// Hit-id counter for hits this entity deals.
#[derive(Debug, Clone, Copy, Default, Component)]
pub struct HitCounter {
    last: u64,
}

impl HitCounter {
    /// Next hit id. Ids start at 1 and strictly increase.
    pub fn mint(&mut self) -> u64 {
        self.last += 1;
        self.last
    }
}

/// Skill caster state of an entity that can cast.
#[derive(Debug, Clone, Component)]
pub struct Loadout(pub SkillCaster);

// ---------------------------------------------------------------------------
// Spawn parameters and views
// ---------------------------------------------------------------------------

/// Everything needed to spawn a combatant.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatantSpec {
    pub team: u8,
    pub controller: NodeId,
    pub max_health: f32,
    pub defense: f32,
    pub element: Element,
    pub position: Vec3,
}

impl CombatantSpec {
    pub fn new(team: u8, controller: NodeId, max_health: f32) -> Self {
        Self {
            team,
            controller,
            max_health,
            defense: 0.0,
            element: Element::Neutral,
            position: Vec3::ZERO,
        }
    }

    pub fn with_defense(mut self, defense: f32) -> Self {
        self.defense = defense;
        self
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.element = element;
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }
}

/// Read-only snapshot used for targeting and tracing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorView {
    pub id: EntityId,
    pub team: u8,
    pub position: Vec3,
    pub alive: bool,
}

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

/// Arena of damageable entities on one node.
pub struct EntityRegistry {
    world: World,
    index: FxHashMap<EntityId, Entity>,
    node: NodeId,
    next_counter: u32,
    hit_ttl: f64,
}

impl EntityRegistry {
    /// Create an empty registry minting ids for `node`.
    pub fn new(node: NodeId, hit_ttl: f64) -> Self {
        debug_assert!(
            node.0 <= MAX_HIT_NODE,
            "{node} does not fit in the hit-id node bits"
        );
        Self {
            world: World::new(),
            index: FxHashMap::default(),
            node,
            next_counter: 0,
            hit_ttl,
        }
    }

    /// Spawn a fresh entity at full health under a newly minted id.
    pub fn spawn(&mut self, spec: &CombatantSpec, caster: Option<SkillCaster>) -> EntityId {
        self.next_counter += 1;
        let id = EntityId::compose(self.node, self.next_counter);
        self.insert(id, spec, spec.max_health, caster);
        id
    }

    /// Insert a mirror of an entity minted elsewhere. Returns `false` (and
    /// changes nothing) if the id is already present.
    pub fn insert_mirror(
        &mut self,
        id: EntityId,
        spec: &CombatantSpec,
        health: f32,
        caster: Option<SkillCaster>,
    ) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        self.insert(id, spec, health, caster);
        true
    }

    fn insert(&mut self, id: EntityId, spec: &CombatantSpec, health: f32, caster: Option<SkillCaster>) {
        let combatant = Combatant {
            id,
            team: spec.team,
            controller: spec.controller,
            health,
            max_health: spec.max_health,
            alive: health > 0.0,
            defense: spec.defense,
            element: spec.element,
            revision: 0,
            deaths: 0,
        };
        let mut entity = self.world.spawn((
            combatant,
            Position(spec.position),
            HitLedger(HitDedupCache::new(self.hit_ttl)),
            HitCounter::default(),
        ));
        if let Some(caster) = caster {
            entity.insert(Loadout(caster));
        }
        self.index.insert(id, entity.id());
    }

    /// Remove an entity. Returns `false` if the id was unknown.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        match self.index.remove(&id) {
            Some(entity) => self.world.despawn(entity),
            None => false,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn combatant(&self, id: EntityId) -> Option<&Combatant> {
        let entity = *self.index.get(&id)?;
        self.world.get::<Combatant>(entity)
    }

    pub fn combatant_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        let entity = *self.index.get(&id)?;
        self.world.get_mut::<Combatant>(entity).map(Mut::into_inner)
    }

    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        let entity = *self.index.get(&id)?;
        self.world.get::<Position>(entity).map(|p| p.0)
    }

    /// Move an entity. Returns `false` if the id is unknown.
    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> bool {
        let Some(&entity) = self.index.get(&id) else {
            return false;
        };
        match self.world.get_mut::<Position>(entity) {
            Some(mut current) => {
                current.0 = position;
                true
            }
            None => false,
        }
    }

    pub fn hit_ledger_mut(&mut self, id: EntityId) -> Option<&mut HitDedupCache> {
        let entity = *self.index.get(&id)?;
        self.world
            .get_mut::<HitLedger>(entity)
            .map(|ledger| &mut ledger.into_inner().0)
    }

    /// Mint the next hit id for `attacker`. The minting node sits in the
    /// high bits so two nodes minting for one attacker never collide.
    pub fn mint_hit_id(&mut self, attacker: EntityId) -> Option<u64> {
        let entity = *self.index.get(&attacker)?;
        let counter = self.world.get_mut::<HitCounter>(entity)?.into_inner().mint();
        debug_assert!(counter >> HIT_ID_NODE_SHIFT == 0, "hit counter reached the node bits");
        Some((u64::from(self.node.0) << HIT_ID_NODE_SHIFT) | counter)
    }

    pub fn caster(&self, id: EntityId) -> Option<&SkillCaster> {
        let entity = *self.index.get(&id)?;
        self.world.get::<Loadout>(entity).map(|l| &l.0)
    }

    pub fn caster_mut(&mut self, id: EntityId) -> Option<&mut SkillCaster> {
        let entity = *self.index.get(&id)?;
        self.world
            .get_mut::<Loadout>(entity)
            .map(|loadout| &mut loadout.into_inner().0)
    }

    /// Advance every caster's cooldowns by `dt` seconds.
    pub fn tick_cooldowns(&mut self, dt: f32) {
        let mut query = self.world.query::<&mut Loadout>();
        for mut loadout in query.iter_mut(&mut self.world) {
            loadout.0.tick_cooldowns(dt);
        }
    }

    /// Every known id, sorted.
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.index.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of every entity, sorted by id.
    pub fn actor_views(&self) -> Vec<ActorView> {
        self.ids()
            .into_iter()
            .filter_map(|id| {
                let combatant = self.combatant(id)?;
                Some(ActorView {
                    id,
                    team: combatant.team,
                    position: self.position(id).unwrap_or(Vec3::ZERO),
                    alive: combatant.alive,
                })
            })
            .collect()
    }

    /// Teams with at least one living entity, sorted.
    pub fn alive_teams(&self) -> Vec<u8> {
        let mut teams: Vec<u8> = self
            .index
            .keys()
            .filter_map(|id| self.combatant(*id))
            .filter(|c| c.alive)
            .map(|c| c.team)
            .collect();
        teams.sort_unstable();
        teams.dedup();
        teams
    }

    /// Ids of entities driven by `node`, sorted.
    pub fn controlled_by(&self, node: NodeId) -> Vec<EntityId> {
        self.ids()
            .into_iter()
            .filter(|id| self.combatant(*id).is_some_and(|c| c.controller == node))
            .collect()
    }

    /// The underlying ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> EntityRegistry {
        EntityRegistry::new(NodeId(0), 3.0)
    }

    #[test]
    fn test_spawn_mints_node_scoped_ids() {
        let mut reg = registry();
        let a = reg.spawn(&CombatantSpec::new(0, NodeId(0), 100.0), None);
        let b = reg.spawn(&CombatantSpec::new(1, NodeId(1), 80.0), None);
        assert_ne!(a, b);
        assert_eq!(a.minted_by(), NodeId(0));
        assert_ne!(a, EntityId::ENVIRONMENT);
        let c = reg.combatant(b).unwrap();
        assert_eq!(c.health, 80.0);
        assert!(c.alive);
        assert_eq!(c.controller, NodeId(1));
    }

    #[test]
    fn test_despawn_invalidates_id() {
        let mut reg = registry();
        let id = reg.spawn(&CombatantSpec::new(0, NodeId(0), 100.0), None);
        assert!(reg.despawn(id));
        assert!(reg.combatant(id).is_none());
        assert!(reg.mint_hit_id(id).is_none());
        assert!(!reg.despawn(id));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_mirror_insert_is_idempotent() {
        let mut reg = EntityRegistry::new(NodeId(2), 3.0);
        let id = EntityId::compose(NodeId(0), 9);
        let spec = CombatantSpec::new(1, NodeId(0), 100.0);
        assert!(reg.insert_mirror(id, &spec, 60.0, None));
        assert!(!reg.insert_mirror(id, &spec, 100.0, None));
        assert_eq!(reg.combatant(id).unwrap().health, 60.0);
    }

    #[test]
    fn test_hit_ids_increase_per_attacker() {
        let mut reg = registry();
        let a = reg.spawn(&CombatantSpec::new(0, NodeId(0), 100.0), None);
        let b = reg.spawn(&CombatantSpec::new(1, NodeId(0), 100.0), None);
        assert_eq!(reg.mint_hit_id(a), Some(1));
        assert_eq!(reg.mint_hit_id(a), Some(2));
        assert_eq!(reg.mint_hit_id(b), Some(1));

        let mut mirror = EntityRegistry::new(NodeId(3), 3.0);
        mirror.insert_mirror(a, &CombatantSpec::new(0, NodeId(0), 100.0), 100.0, None);
        let minted = mirror.mint_hit_id(a).unwrap();
        assert_eq!(minted >> HIT_ID_NODE_SHIFT, 3);
        assert_ne!(minted, 1);
    }

    #[test]
    fn test_highest_node_keeps_its_hit_id_bits() {
        let owner = EntityId::compose(NodeId(0), 1);
        let mut mirror = EntityRegistry::new(NodeId(MAX_HIT_NODE), 3.0);
        mirror.insert_mirror(owner, &CombatantSpec::new(0, NodeId(0), 100.0), 100.0, None);
        let minted = mirror.mint_hit_id(owner).unwrap();
        assert_eq!(minted >> HIT_ID_NODE_SHIFT, u64::from(MAX_HIT_NODE));
        assert_eq!(minted & ((1 << HIT_ID_NODE_SHIFT) - 1), 1);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "hit-id node bits")]
    fn test_node_beyond_hit_id_range_is_rejected() {
        EntityRegistry::new(NodeId(MAX_HIT_NODE + 1), 3.0);
    }

    #[test]
    fn test_alive_teams_and_views() {
        let mut reg = registry();
        let a = reg.spawn(&CombatantSpec::new(2, NodeId(0), 100.0).at(Vec3::X), None);
        reg.spawn(&CombatantSpec::new(0, NodeId(0), 100.0), None);
        reg.spawn(&CombatantSpec::new(0, NodeId(0), 100.0), None);
        assert_eq!(reg.alive_teams(), vec![0, 2]);

        reg.combatant_mut(a).unwrap().alive = false;
        assert_eq!(reg.alive_teams(), vec![0]);

        let views = reg.actor_views();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].id, a);
        assert_eq!(views[0].position, Vec3::X);
        assert!(!views[0].alive);
    }

    #[test]
    fn test_set_position() {
        let mut reg = registry();
        let id = reg.spawn(&CombatantSpec::new(0, NodeId(0), 100.0), None);
        assert!(reg.set_position(id, Vec3::new(1.0, 0.0, 2.0)));
        assert_eq!(reg.position(id), Some(Vec3::new(1.0, 0.0, 2.0)));
        assert!(!reg.set_position(EntityId::compose(NodeId(5), 1), Vec3::ZERO));
    }
}
