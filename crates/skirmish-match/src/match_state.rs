//! Match lifecycle, score ledger and per-mode win conditions.
//!
//! [`MatchStateMachine`] lives on the authority only and is the single
//! writer of scores and match phase. Observers keep a [`MatchMirror`] that
//! is fed by replication commands and tolerates duplicated or reordered
//! delivery.

use glam::Vec2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use skirmish_config::{MatchConfig, MatchMode};
use skirmish_net::EntityId;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reasons a [`MatchConfig`] cannot start a match.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchConfigError {
    #[error("a match needs at least one team")]
    NoTeams,

    #[error("a match needs at least one player per team")]
    NoPlayers,

    #[error("team deathmatch needs a positive duration")]
    ZeroDuration,

    #[error("arena needs a positive kill limit, got {0}")]
    NonPositiveKillLimit(i32),

    #[error("battle royale needs at least one zone stage")]
    NoZoneStages,

    #[error("zone tick interval must be positive, got {0}")]
    NonPositiveZoneTick(f32),
}

/// Check a config before it is used to initialize a match.
pub fn validate(config: &MatchConfig) -> Result<(), MatchConfigError> {
    if config.team_count == 0 {
        return Err(MatchConfigError::NoTeams);
    }
    if config.players_per_team == 0 {
        return Err(MatchConfigError::NoPlayers);
    }
    match config.mode {
        MatchMode::TeamDeathmatch if config.match_duration_secs == 0 => {
            Err(MatchConfigError::ZeroDuration)
        }
        MatchMode::Arena if config.kill_limit <= 0 => {
            Err(MatchConfigError::NonPositiveKillLimit(config.kill_limit))
        }
        MatchMode::BattleRoyale if config.zone.stages.is_empty() => {
            Err(MatchConfigError::NoZoneStages)
        }
        MatchMode::BattleRoyale if config.zone.tick_interval_secs <= 0.0 => Err(
            MatchConfigError::NonPositiveZoneTick(config.zone.tick_interval_secs),
        ),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// ScoreLedger
// ---------------------------------------------------------------------------

/// Team scores and kill counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLedger {
    scores: Vec<i32>,
    kills: Vec<u32>,
    /// Bumped on every score mutation; stamped on replicated snapshots.
    revision: u32,
}

impl ScoreLedger {
    /// A ledger with every team at zero.
    pub fn zeroed(team_count: u8) -> Self {
        Self {
            scores: vec![0; usize::from(team_count)],
            kills: vec![0; usize::from(team_count)],
            revision: 0,
        }
    }

    pub fn team_count(&self) -> usize {
        self.scores.len()
    }

    pub fn scores(&self) -> &[i32] {
        &self.scores
    }

    pub fn score(&self, team: u8) -> Option<i32> {
        self.scores.get(usize::from(team)).copied()
    }

    pub fn kills(&self, team: u8) -> Option<u32> {
        self.kills.get(usize::from(team)).copied()
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Add `delta` to a team. Returns the new score, or `None` for a bad
    /// index or an overflowing sum; the ledger is unchanged in both cases.
    pub fn add(&mut self, team: u8, delta: i32) -> Option<i32> {
        let score = self.scores.get_mut(usize::from(team))?;
        *score = score.checked_add(delta)?;
        self.revision += 1;
        Some(*score)
    }

    /// Overwrite a team's score.
    pub fn set(&mut self, team: u8, value: i32) -> bool {
        match self.scores.get_mut(usize::from(team)) {
            Some(score) => {
                *score = value;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn record_kill(&mut self, team: u8) -> Option<u32> {
        let kills = self.kills.get_mut(usize::from(team))?;
        *kills += 1;
        Some(*kills)
    }

    /// Team with the strictly highest score; the lower index wins ties.
    pub fn leader(&self) -> Option<u8> {
        self.ranking().first().copied()
    }

    /// Teams ordered by score, highest first, lower index first on ties.
    pub fn ranking(&self) -> Vec<u8> {
        rank_scores(&self.scores)
    }
}

fn rank_scores(scores: &[i32]) -> Vec<u8> {
    let mut order: Vec<u8> = (0..scores.len()).filter_map(|i| u8::try_from(i).ok()).collect();
    order.sort_by(|a, b| {
        scores[usize::from(*b)]
            .cmp(&scores[usize::from(*a)])
            .then(a.cmp(b))
    });
    order
}

/// 1-based placement per team: the winner (if any) first, then the rest by
/// score.
pub fn team_placements(scores: &[i32], winner: Option<u8>) -> Vec<u32> {
    let mut order = rank_scores(scores);
    if let Some(w) = winner
        && let Some(pos) = order.iter().position(|t| *t == w)
    {
        order.remove(pos);
        order.insert(0, w);
    }
    let mut placements = vec![0; scores.len()];
    for (rank, team) in order.iter().enumerate() {
        placements[usize::from(*team)] = rank as u32 + 1;
    }
    placements
}

// ---------------------------------------------------------------------------
// MatchStateMachine
// ---------------------------------------------------------------------------

/// Lifecycle phase. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    Configuring,
    Running,
    Ended,
}

/// Frozen result of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub mode: MatchMode,
    pub winner: Option<u8>,
    pub scores: Vec<i32>,
    /// 1-based placement indexed by team.
    pub placements: Vec<u32>,
}

impl MatchOutcome {
    pub fn placement(&self, team: u8) -> Option<u32> {
        self.placements.get(usize::from(team)).copied()
    }
}

/// Result of [`MatchStateMachine::report_kill`].
#[derive(Debug, Clone, PartialEq)]
pub enum KillReport {
    /// Not running, or an unknown team.
    Ignored,
    Scored {
        team: u8,
        score: i32,
        /// Set if this kill ended the match.
        outcome: Option<MatchOutcome>,
    },
}

/// Result of a countdown tick that crossed at least one whole second.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    pub time_left: u32,
    pub outcome: Option<MatchOutcome>,
}

/// Authoritative match lifecycle.
#[derive(Debug, Clone)]
pub struct MatchStateMachine {
    config: MatchConfig,
    phase: MatchPhase,
    ledger: ScoreLedger,
    time_left: u32,
    second_accum: f64,
    outcome: Option<MatchOutcome>,
}

impl MatchStateMachine {
    /// Validate `config` and enter [`MatchPhase::Configuring`] with a zeroed
    /// ledger.
    pub fn initialize_from(config: MatchConfig) -> Result<Self, MatchConfigError> {
        validate(&config)?;
        Ok(Self {
            ledger: ScoreLedger::zeroed(config.team_count),
            time_left: config.match_duration_secs,
            config,
            phase: MatchPhase::Configuring,
            second_accum: 0.0,
            outcome: None,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn mode(&self) -> MatchMode {
        self.config.mode
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == MatchPhase::Running
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Team-Deathmatch seconds remaining.
    pub fn time_left(&self) -> Option<u32> {
        (self.config.mode == MatchMode::TeamDeathmatch).then_some(self.time_left)
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    /// Teams are assigned: start the match. Returns `false` outside
    /// [`MatchPhase::Configuring`].
    pub fn mark_teams_assigned_and_ready(&mut self) -> bool {
        if self.phase != MatchPhase::Configuring {
            return false;
        }
        self.phase = MatchPhase::Running;
        tracing::info!(
            "Match running: {:?}, {} teams",
            self.config.mode,
            self.config.team_count
        );
        true
    }

    /// Credit a kill to `killer_team` and evaluate the mode's win condition.
    /// `alive_teams` lists teams that still have a living member.
    pub fn report_kill(&mut self, killer_team: u8, alive_teams: &[u8]) -> KillReport {
        if !self.is_running() {
            tracing::trace!("Kill for team {} ignored outside running phase", killer_team);
            return KillReport::Ignored;
        }
        let points = match self.config.mode {
            MatchMode::TeamDeathmatch => self.config.points_per_kill,
            MatchMode::Arena | MatchMode::BattleRoyale => 1,
        };
        let Some(score) = self.ledger.add(killer_team, points) else {
            tracing::debug!("Kill for team {} not scored (unknown team or overflow)", killer_team);
            return KillReport::Ignored;
        };
        self.ledger.record_kill(killer_team);

        let outcome = match self.config.mode {
            MatchMode::Arena if score >= self.config.kill_limit => {
                self.end_match_with_winner(Some(killer_team))
            }
            MatchMode::BattleRoyale => self.check_last_team_standing(alive_teams),
            _ => None,
        };
        KillReport::Scored {
            team: killer_team,
            score,
            outcome,
        }
    }

    /// A death nobody scored (boundary, self-inflicted). Only Battle-Royale
    /// cares.
    pub fn report_elimination(&mut self, alive_teams: &[u8]) -> Option<MatchOutcome> {
        if !self.is_running() || self.config.mode != MatchMode::BattleRoyale {
            return None;
        }
        self.check_last_team_standing(alive_teams)
    }

    fn check_last_team_standing(&mut self, alive_teams: &[u8]) -> Option<MatchOutcome> {
        match alive_teams {
            [] => self.end_match_with_winner(None),
            [survivor] => self.end_match_with_winner(Some(*survivor)),
            _ => None,
        }
    }

    /// Add to a team's score outside the kill path.
    pub fn add_team_score(&mut self, team: u8, delta: i32) -> Option<i32> {
        if !self.is_running() {
            return None;
        }
        self.ledger.add(team, delta)
    }

    /// Advance the Team-Deathmatch countdown. Returns `Some` when at least one
    /// whole second elapsed.
    pub fn tick(&mut self, dt: f64) -> Option<Countdown> {
        if !self.is_running() || self.config.mode != MatchMode::TeamDeathmatch {
            return None;
        }
        self.second_accum += dt;
        let mut crossed = false;
        while self.second_accum >= 1.0 && self.time_left > 0 {
            self.second_accum -= 1.0;
            self.time_left -= 1;
            crossed = true;
        }
        if !crossed {
            return None;
        }
        let outcome = if self.time_left == 0 {
            let leader = self.ledger.leader();
            self.end_match_with_winner(leader)
        } else {
            None
        };
        Some(Countdown {
            time_left: self.time_left,
            outcome,
        })
    }

    /// Freeze the match. Returns the outcome, or `None` if the match was not
    /// running or `winner` is not a team.
    pub fn end_match_with_winner(&mut self, winner: Option<u8>) -> Option<MatchOutcome> {
        if !self.is_running() {
            return None;
        }
        if winner.is_some_and(|w| usize::from(w) >= self.ledger.team_count()) {
            tracing::debug!("Winner {:?} is not a team, ignoring", winner);
            return None;
        }
        let scores = self.ledger.scores().to_vec();
        let outcome = MatchOutcome {
            mode: self.config.mode,
            winner,
            placements: team_placements(&scores, winner),
            scores,
        };
        self.phase = MatchPhase::Ended;
        self.outcome = Some(outcome.clone());
        tracing::info!("Match ended: winner {:?}, scores {:?}", winner, outcome.scores);
        Some(outcome)
    }
}

// ---------------------------------------------------------------------------
// MatchMirror
// ---------------------------------------------------------------------------

/// Final result as seen by any node.
#[derive(Debug, Clone, PartialEq)]
pub struct MirroredResult {
    pub mode: MatchMode,
    pub winner: Option<u8>,
    pub scores: Vec<i32>,
}

/// Read-only view of the match on any node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchMirror {
    mode: Option<MatchMode>,
    phase: Option<MatchPhase>,
    scores: Vec<i32>,
    score_revisions: Vec<u32>,
    time_left: Option<u32>,
    zone: Option<(Vec2, f32)>,
    result: Option<MirroredResult>,
    placements: FxHashMap<EntityId, u32>,
}

impl MatchMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the configured match. Later duplicates change nothing.
    pub fn configure(&mut self, mode: MatchMode, team_count: u8) {
        if self.mode.is_some() {
            return;
        }
        self.mode = Some(mode);
        let teams = usize::from(team_count);
        if self.scores.len() < teams {
            self.scores.resize(teams, 0);
            self.score_revisions.resize(teams, 0);
        }
        if self.phase.is_none() {
            self.phase = Some(MatchPhase::Configuring);
        }
    }

    pub fn start(&mut self) {
        if self.phase != Some(MatchPhase::Ended) {
            self.phase = Some(MatchPhase::Running);
        }
    }

    /// Apply a score snapshot unless a newer one for the team was seen.
    pub fn apply_score(&mut self, team: u8, value: i32, revision: u32) -> bool {
        let index = usize::from(team);
        if self.phase == Some(MatchPhase::Ended) {
            return false;
        }
        if self.scores.len() <= index {
            self.scores.resize(index + 1, 0);
            self.score_revisions.resize(index + 1, 0);
        }
        if revision <= self.score_revisions[index] {
            return false;
        }
        self.scores[index] = value;
        self.score_revisions[index] = revision;
        true
    }

    /// The countdown only goes down.
    pub fn apply_time_left(&mut self, secs: u32) {
        self.time_left = Some(self.time_left.map_or(secs, |t| t.min(secs)));
    }

    /// The zone only shrinks.
    pub fn apply_zone(&mut self, center: Vec2, radius: f32) -> bool {
        match self.zone {
            Some((_, current)) if current <= radius => false,
            _ => {
                self.zone = Some((center, radius));
                true
            }
        }
    }

    /// Record the final result. Returns `false` for a repeat.
    pub fn finish(&mut self, mode: MatchMode, winner: Option<u8>, scores: Vec<i32>) -> bool {
        if self.result.is_some() {
            return false;
        }
        self.mode = Some(mode);
        self.phase = Some(MatchPhase::Ended);
        self.scores.clone_from(&scores);
        self.result = Some(MirroredResult {
            mode,
            winner,
            scores,
        });
        true
    }

    /// Record a participant's placement. Returns `false` for a repeat.
    pub fn record_placement(&mut self, player: EntityId, placement: u32) -> bool {
        self.placements.insert(player, placement).is_none()
    }

    pub fn mode(&self) -> Option<MatchMode> {
        self.mode
    }

    pub fn phase(&self) -> Option<MatchPhase> {
        self.phase
    }

    pub fn scores(&self) -> &[i32] {
        &self.scores
    }

    pub fn time_left(&self) -> Option<u32> {
        self.time_left
    }

    pub fn zone(&self) -> Option<(Vec2, f32)> {
        self.zone
    }

    pub fn result(&self) -> Option<&MirroredResult> {
        self.result.as_ref()
    }

    pub fn placement(&self, player: EntityId) -> Option<u32> {
        self.placements.get(&player).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_net::NodeId;

    fn config(mode: MatchMode, team_count: u8) -> MatchConfig {
        MatchConfig {
            mode,
            team_count,
            players_per_team: 1,
            ..MatchConfig::default()
        }
    }

    fn running(config: MatchConfig) -> MatchStateMachine {
        let mut sm = MatchStateMachine::initialize_from(config).unwrap();
        assert!(sm.mark_teams_assigned_and_ready());
        sm
    }

    #[test]
    fn test_lifecycle_is_monotonic() {
        let mut sm = MatchStateMachine::initialize_from(config(MatchMode::Arena, 2)).unwrap();
        assert_eq!(sm.phase(), MatchPhase::Configuring);
        assert_eq!(sm.ledger().scores(), &[0, 0]);
        assert_eq!(sm.report_kill(0, &[0, 1]), KillReport::Ignored);
        assert!(sm.end_match_with_winner(Some(0)).is_none());

        assert!(sm.mark_teams_assigned_and_ready());
        assert!(!sm.mark_teams_assigned_and_ready());
        assert!(sm.end_match_with_winner(Some(1)).is_some());
        assert_eq!(sm.phase(), MatchPhase::Ended);
        assert!(!sm.mark_teams_assigned_and_ready());
        assert_eq!(sm.report_kill(0, &[0, 1]), KillReport::Ignored);
        assert_eq!(sm.add_team_score(0, 5), None);
        assert_eq!(sm.ledger().scores(), &[0, 0]);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert_eq!(
            MatchStateMachine::initialize_from(config(MatchMode::Arena, 0)).unwrap_err(),
            MatchConfigError::NoTeams
        );
        let mut arena = config(MatchMode::Arena, 2);
        arena.kill_limit = 0;
        assert_eq!(validate(&arena), Err(MatchConfigError::NonPositiveKillLimit(0)));
        let mut br = config(MatchMode::BattleRoyale, 4);
        br.zone.stages.clear();
        assert_eq!(validate(&br), Err(MatchConfigError::NoZoneStages));
        let mut tdm = config(MatchMode::TeamDeathmatch, 2);
        tdm.match_duration_secs = 0;
        assert_eq!(validate(&tdm), Err(MatchConfigError::ZeroDuration));
    }

    #[test]
    fn test_arena_kill_limit() {
        let mut cfg = config(MatchMode::Arena, 2);
        cfg.kill_limit = 5;
        let mut sm = running(cfg);
        for _ in 0..4 {
            assert!(matches!(
                sm.report_kill(0, &[0, 1]),
                KillReport::Scored { outcome: None, .. }
            ));
        }
        assert_eq!(sm.phase(), MatchPhase::Running);
        assert_eq!(sm.ledger().kills(0), Some(4));

        let KillReport::Scored { score, outcome, .. } = sm.report_kill(0, &[0, 1]) else {
            panic!("kill should score");
        };
        assert_eq!(score, 5);
        let outcome = outcome.expect("fifth kill ends the match");
        assert_eq!(outcome.winner, Some(0));
        assert_eq!(sm.phase(), MatchPhase::Ended);
    }

    #[test]
    fn test_tdm_points_per_kill() {
        let mut cfg = config(MatchMode::TeamDeathmatch, 2);
        cfg.points_per_kill = 3;
        let mut sm = running(cfg);
        sm.report_kill(1, &[0, 1]);
        sm.report_kill(1, &[0, 1]);
        assert_eq!(sm.ledger().score(1), Some(6));
        assert_eq!(sm.ledger().kills(1), Some(2));
    }

    #[test]
    fn test_score_overflow_leaves_ledger_unchanged() {
        let mut sm = running(config(MatchMode::TeamDeathmatch, 2));
        assert_eq!(sm.add_team_score(0, i32::MAX), Some(i32::MAX));
        let revision = sm.ledger().revision();

        assert_eq!(sm.add_team_score(0, 1), None);
        assert_eq!(sm.ledger().score(0), Some(i32::MAX));
        assert_eq!(sm.ledger().revision(), revision);

        assert_eq!(sm.report_kill(0, &[0, 1]), KillReport::Ignored);
        assert_eq!(sm.ledger().kills(0), Some(0));
        assert_eq!(sm.add_team_score(0, -1), Some(i32::MAX - 1));
    }

    #[test]
    fn test_tdm_countdown_tie_goes_to_lower_index() {
        let mut cfg = config(MatchMode::TeamDeathmatch, 3);
        cfg.match_duration_secs = 3;
        let mut sm = running(cfg);
        sm.report_kill(2, &[0, 1, 2]);
        sm.report_kill(1, &[0, 1, 2]);

        assert_eq!(sm.tick(0.5), None);
        assert_eq!(sm.tick(0.5).map(|c| c.time_left), Some(2));
        assert_eq!(sm.tick(1.0).map(|c| c.time_left), Some(1));
        let last = sm.tick(1.0).unwrap();
        assert_eq!(last.time_left, 0);
        let outcome = last.outcome.unwrap();
        assert_eq!(outcome.winner, Some(1));
        assert_eq!(outcome.placements, vec![3, 1, 2]);
        assert_eq!(sm.tick(1.0), None);
    }

    #[test]
    fn test_tdm_large_step_ends_once() {
        let mut cfg = config(MatchMode::TeamDeathmatch, 2);
        cfg.match_duration_secs = 2;
        let mut sm = running(cfg);
        let countdown = sm.tick(10.0).unwrap();
        assert_eq!(countdown.time_left, 0);
        assert_eq!(countdown.outcome.unwrap().winner, Some(0));
    }

    #[test]
    fn test_battle_royale_last_team_standing() {
        let orders: [[u8; 3]; 3] = [[1, 2, 3], [3, 1, 2], [2, 3, 1]];
        for order in orders {
            let mut sm = running(config(MatchMode::BattleRoyale, 4));
            let mut alive = vec![0u8, 1, 2, 3];
            let mut outcome = None;
            for victim in order {
                alive.retain(|t| *t != victim);
                if let KillReport::Scored { outcome: o, .. } = sm.report_kill(0, &alive) {
                    outcome = o;
                }
            }
            let outcome = outcome.expect("three eliminations end the match");
            assert_eq!(outcome.winner, Some(0));
            assert_eq!(outcome.placement(0), Some(1));
        }
    }

    #[test]
    fn test_battle_royale_no_survivor() {
        let mut sm = running(config(MatchMode::BattleRoyale, 4));
        assert!(sm.report_elimination(&[0, 1]).is_none());
        let outcome = sm.report_elimination(&[]).unwrap();
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.placements.len(), 4);
    }

    #[test]
    fn test_placements_rank_by_score_winner_first() {
        assert_eq!(team_placements(&[5, 9, 1, 9], None), vec![3, 1, 4, 2]);
        assert_eq!(team_placements(&[5, 9, 1, 9], Some(2)), vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_mirror_keeps_newest_score() {
        let mut mirror = MatchMirror::new();
        mirror.configure(MatchMode::Arena, 2);
        assert!(mirror.apply_score(0, 2, 2));
        assert!(!mirror.apply_score(0, 1, 1), "stale snapshot");
        assert!(!mirror.apply_score(0, 2, 2), "duplicate");
        assert_eq!(mirror.scores(), &[2, 0]);

        mirror.apply_time_left(10);
        mirror.apply_time_left(12);
        assert_eq!(mirror.time_left(), Some(10));

        assert!(mirror.finish(MatchMode::Arena, Some(0), vec![5, 3]));
        assert!(!mirror.finish(MatchMode::Arena, Some(0), vec![5, 3]));
        assert!(!mirror.apply_score(1, 9, 99));
        assert_eq!(mirror.phase(), Some(MatchPhase::Ended));

        mirror.start();
        assert_eq!(mirror.phase(), Some(MatchPhase::Ended));
        assert!(mirror.record_placement(EntityId::compose(NodeId(0), 1), 2));
    }

    #[test]
    fn test_outcome_serializes() {
        let outcome = MatchOutcome {
            mode: MatchMode::BattleRoyale,
            winner: None,
            scores: vec![1, 2],
            placements: vec![2, 1],
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let back: MatchOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
