//! Replication command plumbing: wire commands, audience-filtered command
//! bus, command routing table, and the in-process transport mesh.

pub mod bus;
pub mod messages;
pub mod routing;
pub mod transport;

pub use bus::{BusStats, CommandBus};
pub use messages::{
    AnnouncePlacement, AnnounceWinner, Audience, CastSkill, CodecError, Command, DespawnEntity,
    EntityDied, EntityId, EntityRevived, Envelope, HealthChanged, MatchConfigured, NodeId,
    PROTOCOL_VERSION, ReportKill, RequestDamage, ScoreSnapshot, SpawnEntity, TeamScore, TimeLeft,
    ZoneUpdate,
    decode_envelope, encode_envelope,
};
pub use routing::{CommandHandler, CommandTable, CommandTag, Dispatch, HandlerError, NodeContext};
pub use transport::{ChannelTransport, Frame, LinkFaults, Transport, channel_mesh};
