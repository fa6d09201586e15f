use crate::draw::{DrawSequence, TeamOrder, finalize_draw, run_draw};
use crate::results::{MatchResult, ResultOutcome, record_result};
use crate::{Bracket, BracketError, BracketResult, Podium, TEAM_COUNT, Team};
use chrono::{DateTime, Utc};
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse lifecycle of a tournament. Ordered from earliest to latest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Registration,
    Locked,
    Knockout,
    Finished,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Registration => "registration",
            Stage::Locked => "locked",
            Stage::Knockout => "knockout",
            Stage::Finished => "finished",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the persistence provider stores after a draw, all or nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawCommit {
    pub team_order: Vec<String>,
    pub draw_completed: bool,
    pub stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub teams: Vec<Team>,
    #[serde(default)]
    pub team_order: Vec<String>,
    #[serde(default)]
    pub draw_completed: bool,
    #[serde(default)]
    pub bracket: Option<Bracket>,
    #[serde(default)]
    pub champion: Option<Team>,
    #[serde(default)]
    pub podium: Option<Podium>,
    #[serde(default)]
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            teams: Vec::with_capacity(TEAM_COUNT),
            team_order: Vec::new(),
            draw_completed: false,
            bracket: None,
            champion: None,
            podium: None,
            stage: Stage::Registration,
            created_at: Utc::now(),
        }
    }

    fn expect_stage(&self, expected: Stage) -> BracketResult<()> {
        if self.stage != expected {
            return Err(BracketError::InvalidStage { expected, found: self.stage });
        }
        Ok(())
    }

    pub fn register_team(&mut self, team: Team) -> BracketResult<()> {
        self.expect_stage(Stage::Registration)?;
        if self.teams.iter().any(|t| t.is(&team.team_id)) {
            return Err(BracketError::DuplicateTeam(team.team_id));
        }
        if self.teams.len() >= TEAM_COUNT {
            return Err(BracketError::InvalidTeamCount {
                expected: TEAM_COUNT,
                found: self.teams.len() + 1,
            });
        }
        self.teams.push(team);
        Ok(())
    }

    /// Close registration. Only a full field of eight can be locked.
    pub fn lock(&mut self) -> BracketResult<()> {
        self.expect_stage(Stage::Registration)?;
        if self.teams.len() != TEAM_COUNT {
            return Err(BracketError::InvalidTeamCount {
                expected: TEAM_COUNT,
                found: self.teams.len(),
            });
        }
        self.stage = Stage::Locked;
        info!("tournament {} locked with {} teams", self.id, self.teams.len());
        Ok(())
    }

    pub fn start_draw<R: Rng>(&self, rng: R) -> BracketResult<DrawSequence<R>> {
        self.expect_stage(Stage::Locked)?;
        run_draw(self.teams.clone(), rng)
    }

    /// Seed the bracket from a finished draw. Order, flag, stage and bracket
    /// change together or not at all.
    pub fn commit_draw(&mut self, order: &TeamOrder) -> BracketResult<DrawCommit> {
        self.expect_stage(Stage::Locked)?;
        let registered = order
            .teams()
            .iter()
            .filter(|t| self.teams.iter().any(|r| r.is(&t.team_id)))
            .count();
        if registered != TEAM_COUNT {
            return Err(BracketError::IncompleteDraw { selected: registered });
        }

        let commit = DrawCommit {
            team_order: order.team_ids(),
            draw_completed: true,
            stage: Stage::Knockout,
        };
        self.bracket = Some(order.seed_bracket());
        self.team_order = commit.team_order.clone();
        self.draw_completed = commit.draw_completed;
        self.stage = commit.stage;
        info!("tournament {} drawn: {}", self.id, self.team_order.join(", "));
        Ok(commit)
    }

    /// Apply a draw stored elsewhere, resolving ids against the registered teams.
    pub fn apply_draw_commit(&mut self, commit: &DrawCommit) -> BracketResult<()> {
        if !commit.draw_completed {
            return Err(BracketError::IncompleteDraw { selected: commit.team_order.len() });
        }
        let selected: Vec<Team> = commit
            .team_order
            .iter()
            .filter_map(|id| self.teams.iter().find(|t| t.is(id)).cloned())
            .collect();
        let order = finalize_draw(&selected)?;
        self.commit_draw(&order).map(|_| ())
    }

    pub fn record_result(
        &mut self,
        match_id: &str,
        result: &MatchResult,
    ) -> BracketResult<ResultOutcome> {
        self.expect_stage(Stage::Knockout)?;
        let bracket = self
            .bracket
            .as_ref()
            .ok_or_else(|| BracketError::MatchNotFound(match_id.to_owned()))?;
        let outcome = record_result(bracket, match_id, result)?;
        self.apply_outcome(&outcome)?;
        Ok(outcome)
    }

    /// Adopt the bracket from an outcome; the final's outcome closes the tournament.
    pub fn apply_outcome(&mut self, outcome: &ResultOutcome) -> BracketResult<()> {
        self.expect_stage(Stage::Knockout)?;
        self.bracket = Some(outcome.bracket.clone());
        if outcome.tournament_finished {
            self.champion = outcome.champion.clone();
            self.podium = outcome.podium.clone();
            self.stage = Stage::Finished;
            if let Some(champion) = &self.champion {
                info!("tournament {} finished, champion {}", self.id, champion.name);
            }
        }
        Ok(())
    }

    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.is(team_id))
    }
}
