//! Replicated command types and serialization.
//!
//! Every command travels inside an [`Envelope`] serialized with [`postcard`]
//! and prefixed with a protocol version byte. Use [`encode_envelope`] and
//! [`decode_envelope`] for encoding/decoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use skirmish_config::{Element, MatchMode};

/// Current wire-protocol version. Prepended to every serialized envelope.
pub const PROTOCOL_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A session participant (one simulation process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Stable network identifier of a damageable entity.
///
/// Minted by the spawning node: the high 32 bits carry the node id, the low
/// 32 bits a per-node counter starting at 1, so ids never collide across
/// nodes and `0` is free for [`EntityId::ENVIRONMENT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Pseudo-attacker for environmental damage (safe zone).
    pub const ENVIRONMENT: EntityId = EntityId(0);

    /// Composes an id from the minting node and its local counter.
    pub fn compose(node: NodeId, counter: u32) -> Self {
        Self((u64::from(node.0) << 32) | u64::from(counter))
    }

    /// The node that minted this id.
    pub fn minted_by(self) -> NodeId {
        NodeId((self.0 >> 32) as u32)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ENVIRONMENT {
            write!(f, "env")
        } else {
            write!(f, "{}:{}", self.0 >> 32, self.0 & 0xFFFF_FFFF)
        }
    }
}

// ---------------------------------------------------------------------------
// Audience
// ---------------------------------------------------------------------------

/// Which nodes a command is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Audience {
    /// Only the authority node. The sanctioned way to request a mutation.
    AuthorityOnly,
    /// Every participant except the sender.
    AllExceptSender,
    /// Every participant, the sender included.
    AllIncludingSender,
    /// A single participant.
    Node(NodeId),
}

// ---------------------------------------------------------------------------
// Envelope and top-level enum
// ---------------------------------------------------------------------------

/// A command plus its routing header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Node that invoked the command.
    pub sender: NodeId,
    /// Audience the sender addressed.
    pub audience: Audience,
    /// The command itself.
    pub command: Command,
}

/// Top-level replicated command. The enum discriminant is the type tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Command {
    // --- Requests to the authority ---
    /// Ask the authority to resolve a hit on one of its entities.
    RequestDamage(RequestDamage),
    /// Ask the authority to credit a kill to a team.
    ReportKill(ReportKill),
    /// Ask the authority to add to a team's score.
    AddTeamScore(TeamScore),

    // --- Authority broadcasts ---
    /// Overwrite a team's mirrored score.
    SetTeamScore(ScoreSnapshot),
    /// Replay a skill cast.
    CastSkill(CastSkill),
    /// Create a mirror entity.
    SpawnEntity(SpawnEntity),
    /// Remove a mirror entity.
    DespawnEntity(DespawnEntity),
    /// Mirror an entity's health.
    HealthChanged(HealthChanged),
    /// An entity died.
    EntityDied(EntityDied),
    /// A dead entity came back.
    EntityRevived(EntityRevived),
    /// Current safe-zone boundary.
    ZoneUpdate(ZoneUpdate),
    /// The authority configured a match.
    MatchConfigured(MatchConfigured),
    /// The match entered its running phase.
    MatchStarted,
    /// Team-Deathmatch countdown.
    TimeLeft(TimeLeft),
    /// Final outcome.
    AnnounceWinner(AnnounceWinner),
    /// Final placement of one participant.
    AnnouncePlacement(AnnouncePlacement),
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// Hit request forwarded to the authority. Carries the *base* damage; the
/// authority runs the full formula itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestDamage {
    /// Entity being hit.
    pub target: EntityId,
    /// Entity credited with the hit.
    pub attacker: EntityId,
    /// Per-attacker hit counter.
    pub hit_id: u64,
    /// Base damage before type advantage and mitigation.
    pub amount: f32,
    /// Whether the hit was a critical.
    pub critical: bool,
    /// Element of the attack.
    pub element: Element,
    /// Fraction of applied damage healed back to the attacker.
    pub life_steal: f32,
}

/// Kill credit request. `(sender, report_id)` identifies one kill event so
/// the authority can drop redelivered reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportKill {
    /// Team credited with the kill.
    pub killer_team: u8,
    /// Per-sender report counter.
    pub report_id: u64,
}

/// Score delta request. `(sender, request_id)` identifies one request so
/// the authority applies a redelivered copy once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamScore {
    /// Team index.
    pub team: u8,
    /// Delta added to the team's score.
    pub value: i32,
    /// Per-sender request counter.
    pub request_id: u64,
}

/// Authoritative team score. Mirrors keep the highest revision seen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreSnapshot {
    /// Team index.
    pub team: u8,
    /// Score value.
    pub value: i32,
    /// Ledger mutation counter at the time of the snapshot.
    pub revision: u32,
}

/// Compact skill cast descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastSkill {
    /// Casting entity.
    pub actor: EntityId,
    /// Index into the actor's loadout.
    pub skill_index: u8,
    /// Unit aim direction.
    pub direction: [f32; 3],
}

/// Mirror spawn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpawnEntity {
    /// Entity id.
    pub id: EntityId,
    /// Team index.
    pub team: u8,
    /// Node whose player controls the entity.
    pub controller: NodeId,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Flat mitigation.
    pub defense: f32,
    /// Elemental affinity.
    pub element: Element,
    /// World position.
    pub position: [f32; 3],
}

/// Mirror despawn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DespawnEntity {
    /// Entity id.
    pub id: EntityId,
}

/// Authoritative health snapshot. Mirrors apply it only if `revision` is
/// newer than what they hold, so late snapshots never resurrect the dead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthChanged {
    /// Entity id.
    pub id: EntityId,
    /// Health after the change.
    pub health: f32,
    /// Alive flag after the change.
    pub alive: bool,
    /// Per-entity health revision.
    pub revision: u32,
}

/// Death notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityDied {
    /// Entity that died.
    pub victim: EntityId,
    /// Entity credited with the kill, if any.
    pub killer: Option<EntityId>,
    /// How many times the victim has died, this death included.
    pub death_count: u32,
}

/// Revive notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityRevived {
    /// Entity id.
    pub id: EntityId,
    /// Health after reviving.
    pub health: f32,
    /// Respawn position.
    pub position: [f32; 3],
    /// Per-entity health revision.
    pub revision: u32,
}

/// Safe-zone boundary for local rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneUpdate {
    /// Center on the ground plane (x, z).
    pub center: [f32; 2],
    /// Current radius.
    pub radius: f32,
}

/// Match configuration summary for observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchConfigured {
    /// Mode policy.
    pub mode: MatchMode,
    /// Number of teams.
    pub team_count: u8,
}

/// Team-Deathmatch countdown value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeLeft {
    /// Whole seconds remaining.
    pub secs: u32,
}

/// Match outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnounceWinner {
    /// Mode the match ran under.
    pub mode: MatchMode,
    /// Winning team, or `None` for no winner.
    pub winner: Option<u8>,
    /// Final score per team.
    pub scores: Vec<i32>,
}

/// Placement of one participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnouncePlacement {
    /// Participant the placement belongs to.
    pub player: EntityId,
    /// The participant's team.
    pub team: u8,
    /// 1-based placement.
    pub placement: u32,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while decoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload was empty (no version byte).
    #[error("empty payload, no version byte")]
    EmptyPayload,

    /// The version byte does not match [`PROTOCOL_VERSION`].
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Postcard (de)serialization failed.
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// Serialize an [`Envelope`] into a versioned binary frame.
///
/// Wire format: `[version: u8] [postcard-encoded Envelope]`
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    let body = postcard::to_allocvec(envelope)?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(PROTOCOL_VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Deserialize a versioned binary frame into an [`Envelope`].
pub fn decode_envelope(data: &[u8]) -> Result<Envelope, CodecError> {
    let (&version, body) = data.split_first().ok_or(CodecError::EmptyPayload)?;
    if version != PROTOCOL_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    Ok(postcard::from_bytes(body)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(command: Command) -> Envelope {
        Envelope {
            sender: NodeId(2),
            audience: Audience::AuthorityOnly,
            command,
        }
    }

    #[test]
    fn test_request_damage_roundtrip() {
        let env = envelope(Command::RequestDamage(RequestDamage {
            target: EntityId::compose(NodeId(0), 7),
            attacker: EntityId::compose(NodeId(2), 1),
            hit_id: 41,
            amount: 12.5,
            critical: true,
            element: Element::Fire,
            life_steal: 0.0,
        }));
        let bytes = encode_envelope(&env).unwrap();
        assert_eq!(decode_envelope(&bytes).unwrap(), env);

        // serde_json as a second codec proves the derive is codec-agnostic.
        let json = serde_json::to_string(&env).unwrap();
        let from_json: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(env, from_json);
    }

    #[test]
    fn test_announce_winner_without_winner_roundtrip() {
        let env = Envelope {
            sender: NodeId(0),
            audience: Audience::AllIncludingSender,
            command: Command::AnnounceWinner(AnnounceWinner {
                mode: MatchMode::BattleRoyale,
                winner: None,
                scores: vec![3, 0, 1, 2],
            }),
        };
        let bytes = encode_envelope(&env).unwrap();
        assert_eq!(decode_envelope(&bytes).unwrap(), env);
    }

    #[test]
    fn test_cast_descriptor_is_compact() {
        let env = envelope(Command::CastSkill(CastSkill {
            actor: EntityId::compose(NodeId(0), 3),
            skill_index: 1,
            direction: [0.0, 0.0, 1.0],
        }));
        let bytes = encode_envelope(&env).unwrap();
        assert!(bytes.len() < 32, "cast should be compact, got {}", bytes.len());
    }

    #[test]
    fn test_entity_id_composition() {
        let id = EntityId::compose(NodeId(3), 9);
        assert_eq!(id.minted_by(), NodeId(3));
        assert_eq!(id.to_string(), "3:9");
        assert_ne!(EntityId::compose(NodeId(0), 1), EntityId::ENVIRONMENT);
        assert_eq!(EntityId::ENVIRONMENT.to_string(), "env");
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = encode_envelope(&envelope(Command::MatchStarted)).unwrap();
        bytes[0] = 255;
        assert!(matches!(
            decode_envelope(&bytes),
            Err(CodecError::UnsupportedVersion(255))
        ));
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(decode_envelope(&[]), Err(CodecError::EmptyPayload)));
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let result = decode_envelope(&[PROTOCOL_VERSION, 0xFF, 0xFF, 0xFF]);
        assert!(result.is_err());
    }

    #[test]
    fn test_version_byte_is_first_byte() {
        let bytes = encode_envelope(&envelope(Command::MatchStarted)).unwrap();
        assert_eq!(bytes[0], PROTOCOL_VERSION);
    }
}
