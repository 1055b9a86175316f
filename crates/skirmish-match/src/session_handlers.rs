//! Command handlers for [`Session`].
//!
//! Every handler tolerates duplicates and reordering: authority-side requests
//! are guarded by hit dedup or report ids, mirror updates by revisions or
//! monotonic values. A handler that cannot resolve its target returns an
//! error, which the table logs and drops.

use glam::{Vec2, Vec3};
use skirmish_net::{
    Audience, Command, CommandTable, CommandTag, Envelope, HandlerError, NodeContext,
};

use super::Session;
use crate::collaborators::PrefabKind;
use crate::combat::HitRequest;
use crate::entity::CombatantSpec;
use crate::match_state::KillReport;
use crate::skill::CastDescriptor;

/// Routing table shared by every session: audience and handler per tag.
pub(super) fn command_table() -> CommandTable<Session> {
    let mut table = CommandTable::new();

    // Requests to the authority.
    table.register(CommandTag::RequestDamage, Audience::AuthorityOnly, request_damage);
    table.register(CommandTag::ReportKill, Audience::AuthorityOnly, report_kill);
    table.register(CommandTag::AddTeamScore, Audience::AuthorityOnly, add_team_score);

    // Authority broadcasts. The authority applies these itself before sending.
    table.register(CommandTag::SetTeamScore, Audience::AllExceptSender, set_team_score);
    table.register(CommandTag::CastSkill, Audience::AllExceptSender, cast_skill);
    table.register(CommandTag::SpawnEntity, Audience::AllExceptSender, spawn_entity);
    table.register(CommandTag::DespawnEntity, Audience::AllExceptSender, despawn_entity);
    table.register(CommandTag::HealthChanged, Audience::AllExceptSender, health_changed);
    table.register(CommandTag::EntityRevived, Audience::AllExceptSender, entity_revived);
    table.register(CommandTag::ZoneUpdate, Audience::AllExceptSender, zone_update);
    table.register(CommandTag::MatchConfigured, Audience::AllExceptSender, match_configured);
    table.register(CommandTag::MatchStarted, Audience::AllExceptSender, match_started);
    table.register(CommandTag::TimeLeft, Audience::AllExceptSender, time_left);

    // Every node, the authority included, reacts to these.
    table.register(CommandTag::EntityDied, Audience::AllIncludingSender, entity_died);
    table.register(CommandTag::AnnounceWinner, Audience::AllIncludingSender, announce_winner);
    // Sent per participant with `Audience::Node`; this is only the fallback.
    table.register(
        CommandTag::AnnouncePlacement,
        Audience::AllIncludingSender,
        announce_placement,
    );

    table
}

fn mismatch(envelope: &Envelope) -> HandlerError {
    HandlerError::InvalidPayload(format!(
        "{:?} routed to the wrong handler",
        envelope.command.tag()
    ))
}

/// Mirror updates come from the authority; it never applies its own twice.
fn observers_only(ctx: &Session) -> Result<(), HandlerError> {
    if ctx.is_authority() {
        Err(HandlerError::WrongRole)
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

fn request_damage(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::RequestDamage(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    if !ctx.registry.contains(payload.target) {
        return Err(HandlerError::UnknownEntity(payload.target));
    }
    let outcome = ctx.resolve_hit(&HitRequest::from_command(payload));
    tracing::trace!(
        "Hit {} -> {} from {}: {:?}",
        payload.attacker,
        payload.target,
        envelope.sender,
        outcome.status
    );
    Ok(())
}

fn report_kill(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::ReportKill(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    if !ctx.seen_reports.insert((envelope.sender, payload.report_id)) {
        tracing::trace!(
            "Duplicate kill report {} from {}",
            payload.report_id,
            envelope.sender
        );
        return Ok(());
    }
    match ctx.apply_kill(payload.killer_team) {
        KillReport::Scored { .. } => Ok(()),
        KillReport::Ignored => Err(HandlerError::MatchNotRunning),
    }
}

fn add_team_score(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::AddTeamScore(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    if !ctx.seen_score_requests.insert((envelope.sender, payload.request_id)) {
        tracing::trace!(
            "Duplicate score request {} from {}",
            payload.request_id,
            envelope.sender
        );
        return Ok(());
    }
    let game = ctx.game.as_mut().ok_or(HandlerError::MatchNotRunning)?;
    if !game.is_running() {
        return Err(HandlerError::MatchNotRunning);
    }
    if usize::from(payload.team) >= game.ledger().team_count() {
        return Err(HandlerError::InvalidPayload(format!(
            "team {} out of range",
            payload.team
        )));
    }
    let score = game.add_team_score(payload.team, payload.value).ok_or_else(|| {
        HandlerError::InvalidPayload(format!(
            "team {} score overflows by {}",
            payload.team, payload.value
        ))
    })?;
    ctx.publish_score(payload.team, score);
    Ok(())
}

// ---------------------------------------------------------------------------
// Entity mirrors
// ---------------------------------------------------------------------------

fn spawn_entity(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::SpawnEntity(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    observers_only(ctx)?;
    let position = Vec3::from_array(payload.position);
    let spec = CombatantSpec::new(payload.team, payload.controller, payload.max_health)
        .with_defense(payload.defense)
        .with_element(payload.element)
        .at(position);
    let caster = ctx.skills.new_caster();
    if ctx
        .registry
        .insert_mirror(payload.id, &spec, payload.health, Some(caster))
    {
        let handle = ctx
            .collab
            .spawner
            .spawn(PrefabKind::Combatant { team: payload.team }, position);
        ctx.handles.insert(payload.id, handle);
    }
    Ok(())
}

fn despawn_entity(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::DespawnEntity(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    observers_only(ctx)?;
    if ctx.remove_local(payload.id) {
        Ok(())
    } else {
        Err(HandlerError::UnknownEntity(payload.id))
    }
}

fn health_changed(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::HealthChanged(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    observers_only(ctx)?;
    let entity = ctx
        .registry
        .combatant_mut(payload.id)
        .ok_or(HandlerError::UnknownEntity(payload.id))?;
    if payload.revision <= entity.revision {
        tracing::trace!("Stale health r{} for {}", payload.revision, payload.id);
        return Ok(());
    }
    entity.health = payload.health;
    entity.alive = payload.alive;
    entity.revision = payload.revision;
    if !payload.alive
        && let Some(caster) = ctx.registry.caster_mut(payload.id)
    {
        caster.interrupt();
    }
    Ok(())
}

fn entity_revived(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::EntityRevived(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    observers_only(ctx)?;
    let entity = ctx
        .registry
        .combatant_mut(payload.id)
        .ok_or(HandlerError::UnknownEntity(payload.id))?;
    if payload.revision <= entity.revision {
        return Ok(());
    }
    entity.health = payload.health;
    entity.alive = true;
    entity.revision = payload.revision;
    ctx.registry
        .set_position(payload.id, Vec3::from_array(payload.position));
    Ok(())
}

/// Kill feed and kill counts. Applied on every node once per death.
fn entity_died(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::EntityDied(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    if !ctx.seen_deaths.insert((payload.victim, payload.death_count)) {
        return Ok(());
    }
    if let Some(killer) = payload.killer {
        *ctx.kills.entry(killer).or_default() += 1;
    }

    let local = ctx.local_node();
    let victim_is_local = match ctx.registry.combatant_mut(payload.victim) {
        Some(entity) => {
            // Health and the alive flag travel with HealthChanged.
            entity.deaths = entity.deaths.max(payload.death_count);
            entity.controller == local
        }
        None => false,
    };
    if !ctx.is_authority() {
        ctx.scheduler.cancel_owner(payload.victim);
    }

    ctx.collab.ui.push_kill_feed(payload.killer, payload.victim);
    if victim_is_local {
        ctx.collab.ui.show_death_entry(payload.victim, payload.killer);
    }
    Ok(())
}

fn cast_skill(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::CastSkill(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    observers_only(ctx)?;
    let cast = CastDescriptor::from_command(payload);
    if !ctx.registry.contains(cast.actor) {
        return Err(HandlerError::UnknownEntity(cast.actor));
    }
    let in_loadout = ctx
        .registry
        .caster(cast.actor)
        .is_some_and(|c| c.skill(cast.skill_index).is_some());
    if !in_loadout {
        return Err(HandlerError::InvalidPayload(format!(
            "skill index {} out of range",
            cast.skill_index
        )));
    }
    ctx.schedule_shots(&cast, true);
    Ok(())
}

// ---------------------------------------------------------------------------
// Match mirrors
// ---------------------------------------------------------------------------

fn set_team_score(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::SetTeamScore(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    observers_only(ctx)?;
    if !ctx
        .mirror
        .apply_score(payload.team, payload.value, payload.revision)
    {
        tracing::trace!("Stale score r{} for team {}", payload.revision, payload.team);
    }
    Ok(())
}

fn zone_update(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::ZoneUpdate(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    observers_only(ctx)?;
    if !payload.radius.is_finite() || payload.radius < 0.0 {
        return Err(HandlerError::InvalidPayload(format!(
            "zone radius {}",
            payload.radius
        )));
    }
    ctx.apply_zone_update(Vec2::from_array(payload.center), payload.radius);
    Ok(())
}

fn match_configured(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::MatchConfigured(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    observers_only(ctx)?;
    ctx.mirror.configure(payload.mode, payload.team_count);
    Ok(())
}

fn match_started(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    if !matches!(envelope.command, Command::MatchStarted) {
        return Err(mismatch(envelope));
    }
    observers_only(ctx)?;
    ctx.mirror.start();
    Ok(())
}

fn time_left(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::TimeLeft(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    observers_only(ctx)?;
    ctx.apply_time_left(payload.secs);
    Ok(())
}

fn announce_winner(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::AnnounceWinner(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    if ctx
        .mirror
        .finish(payload.mode, payload.winner, payload.scores.clone())
    {
        if !ctx.is_authority() {
            ctx.scheduler.cancel_all();
            for id in ctx.registry.ids() {
                if let Some(caster) = ctx.registry.caster_mut(id) {
                    caster.interrupt();
                }
            }
        }
        ctx.collab
            .ui
            .show_match_end(payload.mode, payload.winner, &payload.scores);
    }
    ctx.submit_results();
    Ok(())
}

fn announce_placement(ctx: &mut Session, envelope: &Envelope) -> Result<(), HandlerError> {
    let Command::AnnouncePlacement(payload) = &envelope.command else {
        return Err(mismatch(envelope));
    };
    let local = ctx
        .registry
        .combatant(payload.player)
        .is_some_and(|c| c.controller == ctx.local_node());
    if ctx.mirror.record_placement(payload.player, payload.placement) && local {
        ctx.collab.ui.show_placement(payload.player, payload.placement);
    }
    ctx.submit_results();
    Ok(())
}
