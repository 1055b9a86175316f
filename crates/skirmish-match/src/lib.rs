//! Authority-gated combat and match state: hit deduplication, damage
//! resolution, skill waves, match lifecycle, the Battle-Royale safe zone and
//! the per-node session that wires them to the command bus.

pub mod collaborators;
pub mod combat;
pub mod entity;
pub mod hit_dedup;
pub mod match_state;
pub mod safe_zone;
pub mod scheduler;
pub mod session;
pub mod skill;

pub use collaborators::{
    CollectingSink, Collaborators, ConeTracer, EntityHandle, MatchResultRecord, MatchUi,
    PoolSpawner, PrefabKind, ResultSink, ShotTracer, Spawner, TracingUi,
};
pub use combat::{
    CombatResolver, DamageOutcome, HitRequest, HitStatus, beats, broadcast_health, heal,
    type_multiplier,
};
pub use entity::{
    ActorView, Combatant, CombatantSpec, EntityRegistry, HIT_ID_NODE_SHIFT, MAX_HIT_NODE,
};
pub use hit_dedup::{DEFAULT_HIT_TTL_SECS, HitDedupCache, HitDedupEntry, HitKey};
pub use match_state::{
    Countdown, KillReport, MatchConfigError, MatchMirror, MatchOutcome, MatchPhase,
    MatchStateMachine, MirroredResult, ScoreLedger, team_placements, validate,
};
pub use safe_zone::{SafeZone, ZoneStep};
pub use scheduler::{DEFAULT_TICK_RATE, DueTask, Scheduler, TaskId, TickSchedule};
pub use session::{MatchSetupError, Session, SessionTask};
pub use skill::{
    CastDescriptor, CastState, FULL_CIRCLE_SPREAD_DEG, PlannedShot, SkillCastCoordinator,
    SkillCaster, nearest_enemy, wave_angles, wave_directions,
};
