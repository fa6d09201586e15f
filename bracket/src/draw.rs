use crate::{Bracket, BracketError, BracketResult, Match, MatchSlot, TEAM_COUNT, Team};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Snapshot of a draw in progress. The two lists always hold all eight teams between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawState {
    pub remaining_teams: Vec<Team>,
    pub selected_teams: Vec<Team>,
}

impl DrawState {
    pub fn new(teams: Vec<Team>) -> BracketResult<Self> {
        if teams.len() != TEAM_COUNT {
            return Err(BracketError::InvalidTeamCount {
                expected: TEAM_COUNT,
                found: teams.len(),
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = teams.iter().find(|t| !seen.insert(t.team_id.as_str())) {
            return Err(BracketError::DuplicateTeam(dup.team_id.clone()));
        }
        Ok(Self {
            remaining_teams: teams,
            selected_teams: Vec::with_capacity(TEAM_COUNT),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.remaining_teams.is_empty()
    }

    /// Draw one team uniformly from those still in the pot.
    /// Returns `None` once the pot is empty.
    pub fn draw_one<R: Rng>(&mut self, rng: &mut R) -> Option<&Team> {
        if self.remaining_teams.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.remaining_teams.len());
        let team = self.remaining_teams.remove(index);
        debug!(
            "drew {} ({} left in the pot)",
            team.team_id,
            self.remaining_teams.len()
        );
        self.selected_teams.push(team);
        self.selected_teams.last()
    }

    pub fn last_drawn(&self) -> Option<&Team> {
        self.selected_teams.last()
    }
}

/// Step-by-step draw: yields the state after each team is revealed.
/// Dropping it part way abandons the draw; nothing else needs cleaning up.
#[derive(Debug)]
pub struct DrawSequence<R> {
    state: DrawState,
    rng: R,
}

impl<R: Rng> DrawSequence<R> {
    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn into_state(self) -> DrawState {
        self.state
    }

    /// Reveal every remaining team and finalize the order.
    pub fn finish(mut self) -> BracketResult<TeamOrder> {
        while self.state.draw_one(&mut self.rng).is_some() {}
        finalize_draw(&self.state.selected_teams)
    }
}

impl<R: Rng> Iterator for DrawSequence<R> {
    type Item = DrawState;

    fn next(&mut self) -> Option<Self::Item> {
        self.state.draw_one(&mut self.rng)?;
        Some(self.state.clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.state.remaining_teams.len();
        (left, Some(left))
    }
}

/// Start a draw over exactly eight teams.
pub fn run_draw<R: Rng>(teams: Vec<Team>, rng: R) -> BracketResult<DrawSequence<R>> {
    Ok(DrawSequence {
        state: DrawState::new(teams)?,
        rng,
    })
}

/// Turn a finished draw into the team order that seeds the bracket.
pub fn finalize_draw(selected: &[Team]) -> BracketResult<TeamOrder> {
    if selected.len() != TEAM_COUNT {
        return Err(BracketError::IncompleteDraw { selected: selected.len() });
    }
    let mut seen = HashSet::new();
    if let Some(dup) = selected.iter().find(|t| !seen.insert(t.team_id.as_str())) {
        return Err(BracketError::DuplicateTeam(dup.team_id.clone()));
    }
    Ok(TeamOrder(selected.iter().map(Team::without_score).collect()))
}

/// Final draw order. Adjacent pairs meet in the quarterfinals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamOrder(Vec<Team>);

impl TeamOrder {
    pub fn teams(&self) -> &[Team] {
        &self.0
    }

    pub fn team_ids(&self) -> Vec<String> {
        self.0.iter().map(|t| t.team_id.clone()).collect()
    }

    pub fn pairings(&self) -> Vec<(&Team, &Team)> {
        self.0.chunks_exact(2).map(|pair| (&pair[0], &pair[1])).collect()
    }

    /// Canonical bracket with the quarterfinals filled from this order.
    pub fn seed_bracket(&self) -> Bracket {
        let mut bracket = Bracket::empty();
        for (i, (team1, team2)) in self.pairings().into_iter().enumerate() {
            let mut m = Match::between(MatchSlot::QuarterFinal(i).key(), team1.clone(), team2.clone());
            m.number = Some(i as u32 + 1);
            bracket.quarter_finals[i] = m;
        }
        bracket
    }
}
