use crate::Match;
use crate::results::MatchResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A player credited in a match report. Roster data lives elsewhere, so
/// identities are carried through without being checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    pub player_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub team_id: String,
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

impl PlayerEntry {
    pub fn new(player_id: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            name: None,
            team_id: team_id.into(),
            count: 1,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn times(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.player_id)
    }
}

/// Per-match payload handed to the statistics store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub match_id: String,
    pub scorers: Vec<PlayerEntry>,
    pub assists: Vec<PlayerEntry>,
    pub mvp: Option<PlayerEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MatchStats {
    pub fn from_result(match_id: impl Into<String>, result: &MatchResult) -> Self {
        Self {
            match_id: match_id.into(),
            scorers: result.scorers.clone(),
            assists: result.assists.clone(),
            mvp: result.mvp.clone(),
            notes: result.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatRole {
    Scorer,
    Assist,
    Mvp,
}

/// A credited player whose team is not in the match. Reported, never enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatIssue {
    pub role: StatRole,
    pub player_id: String,
    pub team_id: String,
}

pub fn check_player_stats(m: &Match, result: &MatchResult) -> Vec<StatIssue> {
    let scorers = result.scorers.iter().map(|p| (StatRole::Scorer, p));
    let assists = result.assists.iter().map(|p| (StatRole::Assist, p));
    let mvp = result.mvp.iter().map(|p| (StatRole::Mvp, p));

    scorers
        .chain(assists)
        .chain(mvp)
        .filter(|(_, p)| !m.involves(&p.team_id))
        .map(|(role, p)| StatIssue {
            role,
            player_id: p.player_id.clone(),
            team_id: p.team_id.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tournament leaderboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerTally {
    pub player_id: String,
    pub name: String,
    pub team_id: String,
    pub goals: u32,
    pub assists: u32,
    pub mvp_awards: u32,
}

#[derive(Debug, Default)]
pub struct Leaderboard {
    players: HashMap<String, PlayerTally>,
}

impl Leaderboard {
    pub fn from_stats<'a>(stats: impl IntoIterator<Item = &'a MatchStats>) -> Self {
        let mut board = Self::default();
        for s in stats {
            board.record(s);
        }
        board
    }

    pub fn record(&mut self, stats: &MatchStats) {
        for p in &stats.scorers {
            self.tally(p).goals += p.count;
        }
        for p in &stats.assists {
            self.tally(p).assists += p.count;
        }
        if let Some(p) = &stats.mvp {
            self.tally(p).mvp_awards += 1;
        }
    }

    fn tally(&mut self, entry: &PlayerEntry) -> &mut PlayerTally {
        let tally = self
            .players
            .entry(entry.player_id.clone())
            .or_insert_with(|| PlayerTally {
                player_id: entry.player_id.clone(),
                name: entry.display_name().to_string(),
                team_id: entry.team_id.clone(),
                ..PlayerTally::default()
            });
        // A later report may carry the name an earlier one left out.
        if entry.name.is_some() && tally.name == tally.player_id {
            tally.name = entry.display_name().to_string();
        }
        tally
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn top_scorers(&self) -> Vec<&PlayerTally> {
        self.ranked(|t| t.goals)
    }

    pub fn top_assists(&self) -> Vec<&PlayerTally> {
        self.ranked(|t| t.assists)
    }

    pub fn mvp_awards(&self) -> Vec<&PlayerTally> {
        self.ranked(|t| t.mvp_awards)
    }

    /// Players with a non-zero count, highest first, ties by name.
    fn ranked(&self, key: impl Fn(&PlayerTally) -> u32) -> Vec<&PlayerTally> {
        let mut rows: Vec<&PlayerTally> = self.players.values().filter(|t| key(t) > 0).collect();
        rows.sort_by(|a, b| {
            key(b)
                .cmp(&key(a))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        rows
    }
}
