//! One-line match summary for the console.
//!
//! Built from a node's read-mirror, so any node can print it: mode, phase,
//! countdown or zone radius, team scores and living bots per team.

use skirmish_config::MatchMode;
use skirmish_match::{MatchPhase, Session};

/// Formatted snapshot of one node's view.
#[derive(Debug, Clone, PartialEq)]
pub struct Scoreboard {
    pub mode: Option<MatchMode>,
    pub phase: Option<MatchPhase>,
    pub time_left: Option<u32>,
    pub zone_radius: Option<f32>,
    pub scores: Vec<i32>,
    pub alive: Vec<usize>,
}

impl Scoreboard {
    pub fn capture(session: &Session) -> Self {
        let mirror = session.mirror();
        let scores = mirror.scores().to_vec();
        let views = session.registry().actor_views();
        let alive = (0..scores.len())
            .map(|team| {
                views
                    .iter()
                    .filter(|v| v.alive && usize::from(v.team) == team)
                    .count()
            })
            .collect();
        Self {
            mode: mirror.mode(),
            phase: mirror.phase(),
            time_left: mirror.time_left(),
            zone_radius: mirror.zone().map(|(_, radius)| radius),
            scores,
            alive,
        }
    }

    pub fn format_line(&self) -> String {
        let mode = match self.mode {
            Some(MatchMode::TeamDeathmatch) => "TDM",
            Some(MatchMode::Arena) => "Arena",
            Some(MatchMode::BattleRoyale) => "BR",
            None => "-",
        };
        let clock = match (self.mode, self.time_left, self.zone_radius) {
            (Some(MatchMode::TeamDeathmatch), Some(secs), _) => {
                format!("{}:{:02}", secs / 60, secs % 60)
            }
            (Some(MatchMode::BattleRoyale), _, Some(radius)) => format!("zone {radius:.1}m"),
            _ => String::new(),
        };
        let teams: Vec<String> = self
            .scores
            .iter()
            .zip(&self.alive)
            .enumerate()
            .map(|(team, (score, alive))| format!("T{team} {score} ({alive} up)"))
            .collect();
        format!(
            "{mode} {:?} {clock} | {}",
            self.phase.unwrap_or(MatchPhase::Configuring),
            teams.join(" | ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_deathmatch_line() {
        let board = Scoreboard {
            mode: Some(MatchMode::TeamDeathmatch),
            phase: Some(MatchPhase::Running),
            time_left: Some(95),
            zone_radius: None,
            scores: vec![3, 1],
            alive: vec![2, 3],
        };
        assert_eq!(
            board.format_line(),
            "TDM Running 1:35 | T0 3 (2 up) | T1 1 (3 up)"
        );
    }

    #[test]
    fn test_format_battle_royale_line() {
        let board = Scoreboard {
            mode: Some(MatchMode::BattleRoyale),
            phase: Some(MatchPhase::Ended),
            time_left: None,
            zone_radius: Some(12.5),
            scores: vec![0],
            alive: vec![1],
        };
        assert_eq!(board.format_line(), "BR Ended zone 12.5m | T0 0 (1 up)");
    }
}
