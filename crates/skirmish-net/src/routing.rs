//! Command routing: the table mapping each [`CommandTag`] to the audience it
//! is addressed with and the handler that applies it on a receiving node.
//!
//! Handlers must be idempotent or guarded by their own dedup; the bus never
//! deduplicates. Handler failures are swallowed and logged here, so one
//! node failing to resolve a target never reaches the sender.

use std::collections::HashMap;

use crate::messages::{Audience, Command, EntityId, Envelope};

// ---------------------------------------------------------------------------
// CommandTag
// ---------------------------------------------------------------------------

/// Unique tag identifying a command type, used as the key for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandTag {
    /// [`Command::RequestDamage`].
    RequestDamage,
    /// [`Command::ReportKill`].
    ReportKill,
    /// [`Command::AddTeamScore`].
    AddTeamScore,
    /// [`Command::SetTeamScore`].
    SetTeamScore,
    /// [`Command::CastSkill`].
    CastSkill,
    /// [`Command::SpawnEntity`].
    SpawnEntity,
    /// [`Command::DespawnEntity`].
    DespawnEntity,
    /// [`Command::HealthChanged`].
    HealthChanged,
    /// [`Command::EntityDied`].
    EntityDied,
    /// [`Command::EntityRevived`].
    EntityRevived,
    /// [`Command::ZoneUpdate`].
    ZoneUpdate,
    /// [`Command::MatchConfigured`].
    MatchConfigured,
    /// [`Command::MatchStarted`].
    MatchStarted,
    /// [`Command::TimeLeft`].
    TimeLeft,
    /// [`Command::AnnounceWinner`].
    AnnounceWinner,
    /// [`Command::AnnouncePlacement`].
    AnnouncePlacement,
}

impl Command {
    /// Extract the routing tag from a command without consuming it.
    pub fn tag(&self) -> CommandTag {
        match self {
            Command::RequestDamage(_) => CommandTag::RequestDamage,
            Command::ReportKill(_) => CommandTag::ReportKill,
            Command::AddTeamScore(_) => CommandTag::AddTeamScore,
            Command::SetTeamScore(_) => CommandTag::SetTeamScore,
            Command::CastSkill(_) => CommandTag::CastSkill,
            Command::SpawnEntity(_) => CommandTag::SpawnEntity,
            Command::DespawnEntity(_) => CommandTag::DespawnEntity,
            Command::HealthChanged(_) => CommandTag::HealthChanged,
            Command::EntityDied(_) => CommandTag::EntityDied,
            Command::EntityRevived(_) => CommandTag::EntityRevived,
            Command::ZoneUpdate(_) => CommandTag::ZoneUpdate,
            Command::MatchConfigured(_) => CommandTag::MatchConfigured,
            Command::MatchStarted => CommandTag::MatchStarted,
            Command::TimeLeft(_) => CommandTag::TimeLeft,
            Command::AnnounceWinner(_) => CommandTag::AnnounceWinner,
            Command::AnnouncePlacement(_) => CommandTag::AnnouncePlacement,
        }
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Why a handler declined to apply a command. Never propagated past the
/// dispatching node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandlerError {
    /// The command names an entity this node does not know (already
    /// despawned, or never replicated here).
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// The command only makes sense on the authority (or only on observers).
    #[error("command not valid on this node's role")]
    WrongRole,

    /// No match is configured or it is not in the phase the command needs.
    #[error("match not in a phase that accepts this command")]
    MatchNotRunning,

    /// Payload fields out of range (team index, skill index, ...).
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Anything a command table can dispatch into.
pub trait NodeContext {
    /// Whether this node holds authority.
    fn is_authority(&self) -> bool;
}

/// Trait for command handlers. Implemented for plain functions and closures.
pub trait CommandHandler<C>: Send + Sync {
    /// Apply one command to the node context.
    fn handle(&self, ctx: &mut C, envelope: &Envelope) -> Result<(), HandlerError>;
}

impl<C, F> CommandHandler<C> for F
where
    F: Fn(&mut C, &Envelope) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, ctx: &mut C, envelope: &Envelope) -> Result<(), HandlerError> {
        self(ctx, envelope)
    }
}

struct Route<C> {
    audience: Audience,
    handler: Box<dyn CommandHandler<C>>,
}

/// What happened to one dispatched envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The handler applied the command.
    Handled,
    /// No route for the command's tag.
    Unrouted,
    /// An authority-only command reached a non-authority node.
    AudienceViolation,
    /// The handler declined; state is unchanged.
    Failed(HandlerError),
}

// ---------------------------------------------------------------------------
// CommandTable
// ---------------------------------------------------------------------------

/// Routes incoming commands to registered handlers by [`CommandTag`].
pub struct CommandTable<C> {
    routes: HashMap<CommandTag, Route<C>>,
}

impl<C: NodeContext> CommandTable<C> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Register the audience and handler for a command tag.
    pub fn register<H: CommandHandler<C> + 'static>(
        &mut self,
        tag: CommandTag,
        audience: Audience,
        handler: H,
    ) {
        self.routes.insert(
            tag,
            Route {
                audience,
                handler: Box::new(handler),
            },
        );
    }

    /// The audience a tag is registered with.
    pub fn audience(&self, tag: CommandTag) -> Option<Audience> {
        self.routes.get(&tag).map(|route| route.audience)
    }

    /// Route one envelope. Failures are logged and reported, never raised.
    pub fn dispatch(&self, ctx: &mut C, envelope: &Envelope) -> Dispatch {
        let tag = envelope.command.tag();
        let Some(route) = self.routes.get(&tag) else {
            tracing::debug!("No route for {:?} from {}, dropping", tag, envelope.sender);
            return Dispatch::Unrouted;
        };

        let authority_only = route.audience == Audience::AuthorityOnly
            || envelope.audience == Audience::AuthorityOnly;
        if authority_only && !ctx.is_authority() {
            tracing::warn!(
                "{:?} from {} is authority-only, dropping on non-authority node",
                tag,
                envelope.sender
            );
            return Dispatch::AudienceViolation;
        }

        match route.handler.handle(ctx, envelope) {
            Ok(()) => Dispatch::Handled,
            Err(err) => {
                tracing::debug!("{:?} from {} not applied: {}", tag, envelope.sender, err);
                Dispatch::Failed(err)
            }
        }
    }

    /// Iterate over registered tags (useful for startup logging).
    pub fn registered_tags(&self) -> impl Iterator<Item = &CommandTag> {
        self.routes.keys()
    }
}

impl<C: NodeContext> Default for CommandTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::*;

    #[derive(Default)]
    struct Counter {
        authority: bool,
        kills: Vec<u8>,
        casts: u32,
    }

    impl NodeContext for Counter {
        fn is_authority(&self) -> bool {
            self.authority
        }
    }

    fn on_kill(ctx: &mut Counter, env: &Envelope) -> Result<(), HandlerError> {
        match &env.command {
            Command::ReportKill(kill) => {
                ctx.kills.push(kill.killer_team);
                Ok(())
            }
            _ => Err(HandlerError::InvalidPayload("expected ReportKill".into())),
        }
    }

    fn table() -> CommandTable<Counter> {
        let mut table = CommandTable::new();
        table.register(CommandTag::ReportKill, Audience::AuthorityOnly, on_kill);
        table.register(
            CommandTag::CastSkill,
            Audience::AllExceptSender,
            |ctx: &mut Counter, _: &Envelope| {
                ctx.casts += 1;
                Ok(())
            },
        );
        table
    }

    fn env(audience: Audience, command: Command) -> Envelope {
        Envelope {
            sender: NodeId(1),
            audience,
            command,
        }
    }

    #[test]
    fn test_command_routed_to_correct_handler() {
        let table = table();
        let mut ctx = Counter {
            authority: true,
            ..Counter::default()
        };
        let outcome = table.dispatch(
            &mut ctx,
            &env(
                Audience::AuthorityOnly,
                Command::ReportKill(ReportKill {
                    killer_team: 1,
                    report_id: 1,
                }),
            ),
        );
        assert_eq!(outcome, Dispatch::Handled);
        assert_eq!(ctx.kills, vec![1]);
        assert_eq!(ctx.casts, 0);
    }

    #[test]
    fn test_authority_only_dropped_on_observer() {
        let table = table();
        let mut observer = Counter::default();
        let outcome = table.dispatch(
            &mut observer,
            &env(
                Audience::AllIncludingSender,
                Command::ReportKill(ReportKill {
                    killer_team: 0,
                    report_id: 1,
                }),
            ),
        );
        assert_eq!(outcome, Dispatch::AudienceViolation);
        assert!(observer.kills.is_empty());
    }

    #[test]
    fn test_unrouted_command_dropped() {
        let table = table();
        let mut ctx = Counter::default();
        let outcome = table.dispatch(&mut ctx, &env(Audience::AllExceptSender, Command::MatchStarted));
        assert_eq!(outcome, Dispatch::Unrouted);
    }

    #[test]
    fn test_registered_audience_lookup() {
        let table = table();
        assert_eq!(
            table.audience(CommandTag::ReportKill),
            Some(Audience::AuthorityOnly)
        );
        assert_eq!(table.audience(CommandTag::TimeLeft), None);
        assert_eq!(table.registered_tags().count(), 2);
    }

    #[test]
    fn test_handler_failure_is_reported_not_raised() {
        let mut table: CommandTable<Counter> = CommandTable::new();
        table.register(
            CommandTag::HealthChanged,
            Audience::AllExceptSender,
            |_: &mut Counter, env: &Envelope| match &env.command {
                Command::HealthChanged(h) => Err(HandlerError::UnknownEntity(h.id)),
                _ => Ok(()),
            },
        );
        let mut ctx = Counter::default();
        let id = EntityId::compose(NodeId(0), 5);
        let outcome = table.dispatch(
            &mut ctx,
            &env(
                Audience::AllExceptSender,
                Command::HealthChanged(HealthChanged {
                    id,
                    health: 10.0,
                    alive: true,
                    revision: 1,
                }),
            ),
        );
        assert_eq!(outcome, Dispatch::Failed(HandlerError::UnknownEntity(id)));
    }
}
