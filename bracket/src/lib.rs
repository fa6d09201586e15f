pub mod cache;
pub mod draw;
pub mod error;
pub mod normalize;
pub mod results;
pub mod stats;
pub mod tournament;
mod wire;

pub use error::{BracketError, BracketResult};

use serde::{Deserialize, Serialize};

/// Registered teams a knockout tournament requires.
pub const TEAM_COUNT: usize = 8;
pub const QUARTER_FINAL_COUNT: usize = 4;
pub const SEMI_FINAL_COUNT: usize = 2;

// ---------------------------------------------------------------------------
// Domain types: canonical bracket model, independent of any backend shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub team_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Only set once the team has played in the match holding it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl Team {
    pub fn new(team_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            name: name.into(),
            logo: None,
            score: None,
        }
    }

    pub fn is(&self, team_id: &str) -> bool {
        self.team_id == team_id
    }

    /// The same team as it enters a fresh slot, without the previous match's score.
    pub fn without_score(&self) -> Team {
        Team { score: None, ..self.clone() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Pending,
    Completed,
}

/// Which of the two slots of a match a team occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Team1,
    Team2,
}

impl Side {
    fn from_index(index: usize) -> Self {
        if index % 2 == 0 { Side::Team1 } else { Side::Team2 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
    /// 1-based position within the round; placeholders carry only this.
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    pub team1: Option<Team>,
    pub team2: Option<Team>,
    #[serde(default)]
    pub winner: Option<Team>,
    #[serde(default)]
    pub status: MatchStatus,
}

impl Match {
    /// Empty slot used to pad rounds the source left short.
    pub fn placeholder(number: u32) -> Self {
        Self { number: Some(number), ..Self::default() }
    }

    pub fn between(match_id: impl Into<String>, team1: Team, team2: Team) -> Self {
        Self {
            match_id: Some(match_id.into()),
            team1: Some(team1),
            team2: Some(team2),
            ..Self::default()
        }
    }

    /// Both slots are filled, so a result may be recorded.
    pub fn is_ready(&self) -> bool {
        self.team1.is_some() && self.team2.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    pub fn team(&self, side: Side) -> Option<&Team> {
        match side {
            Side::Team1 => self.team1.as_ref(),
            Side::Team2 => self.team2.as_ref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, side: Side) -> &mut Option<Team> {
        match side {
            Side::Team1 => &mut self.team1,
            Side::Team2 => &mut self.team2,
        }
    }

    pub fn side_of(&self, team_id: &str) -> Option<Side> {
        if self.team1.as_ref().is_some_and(|t| t.is(team_id)) {
            Some(Side::Team1)
        } else if self.team2.as_ref().is_some_and(|t| t.is(team_id)) {
            Some(Side::Team2)
        } else {
            None
        }
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.side_of(team_id).is_some()
    }

    pub fn loser(&self) -> Option<&Team> {
        let winner = self.winner.as_ref()?;
        match self.side_of(&winner.team_id)? {
            Side::Team1 => self.team2.as_ref(),
            Side::Team2 => self.team1.as_ref(),
        }
    }
}

/// Position of a match in the canonical bracket. Ordered from earliest to latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchSlot {
    QuarterFinal(usize),
    SemiFinal(usize),
    ThirdPlace,
    Final,
}

impl MatchSlot {
    pub fn label(&self) -> String {
        match self {
            MatchSlot::QuarterFinal(i) => format!("Quarterfinal {}", i + 1),
            MatchSlot::SemiFinal(i) => format!("Semifinal {}", i + 1),
            MatchSlot::ThirdPlace => "Third place".to_string(),
            MatchSlot::Final => "Final".to_string(),
        }
    }

    /// Short key used to address a match that carries no id of its own.
    pub fn key(&self) -> String {
        match self {
            MatchSlot::QuarterFinal(i) => format!("qf{}", i + 1),
            MatchSlot::SemiFinal(i) => format!("sf{}", i + 1),
            MatchSlot::ThirdPlace => "third".to_string(),
            MatchSlot::Final => "final".to_string(),
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        match key.as_str() {
            "final" => return Some(MatchSlot::Final),
            "third" | "thirdplace" | "third-place" | "third_place" => {
                return Some(MatchSlot::ThirdPlace);
            }
            _ => {}
        }
        let index = |digits: &str| digits.parse::<usize>().ok().filter(|n| *n > 0).map(|n| n - 1);
        if let Some(digits) = key.strip_prefix("qf") {
            return index(digits).map(MatchSlot::QuarterFinal);
        }
        if let Some(digits) = key.strip_prefix("sf") {
            return index(digits).map(MatchSlot::SemiFinal);
        }
        None
    }

    /// Where the winner of this match plays next.
    /// Quarterfinal `i` feeds semifinal `i / 2`; even indices take the first slot.
    /// Matches kept beyond the canonical round sizes feed nothing.
    pub fn winner_advances_to(&self) -> Option<(MatchSlot, Side)> {
        match self {
            MatchSlot::QuarterFinal(i) if *i < QUARTER_FINAL_COUNT => {
                Some((MatchSlot::SemiFinal(i / 2), Side::from_index(*i)))
            }
            MatchSlot::SemiFinal(i) if *i < SEMI_FINAL_COUNT => {
                Some((MatchSlot::Final, Side::from_index(*i)))
            }
            _ => None,
        }
    }

    /// Semifinal losers drop into the third-place match.
    pub fn loser_drops_to(&self) -> Option<(MatchSlot, Side)> {
        match self {
            MatchSlot::SemiFinal(i) if *i < SEMI_FINAL_COUNT => {
                Some((MatchSlot::ThirdPlace, Side::from_index(*i)))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Podium {
    pub first: Team,
    pub second: Team,
    pub third: Team,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub quarter_finals: Vec<Match>,
    pub semi_finals: Vec<Match>,
    #[serde(rename = "final")]
    pub final_match: Match,
    pub third_place: Match,
}

impl Default for Bracket {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bracket {
    /// A bracket with every slot present and nothing played.
    pub fn empty() -> Self {
        Self {
            quarter_finals: (1..=QUARTER_FINAL_COUNT as u32).map(Match::placeholder).collect(),
            semi_finals: (1..=SEMI_FINAL_COUNT as u32).map(Match::placeholder).collect(),
            final_match: Match::default(),
            third_place: Match::default(),
        }
    }

    pub fn get(&self, slot: MatchSlot) -> Option<&Match> {
        match slot {
            MatchSlot::QuarterFinal(i) => self.quarter_finals.get(i),
            MatchSlot::SemiFinal(i) => self.semi_finals.get(i),
            MatchSlot::ThirdPlace => Some(&self.third_place),
            MatchSlot::Final => Some(&self.final_match),
        }
    }

    pub(crate) fn get_mut(&mut self, slot: MatchSlot) -> Option<&mut Match> {
        match slot {
            MatchSlot::QuarterFinal(i) => self.quarter_finals.get_mut(i),
            MatchSlot::SemiFinal(i) => self.semi_finals.get_mut(i),
            MatchSlot::ThirdPlace => Some(&mut self.third_place),
            MatchSlot::Final => Some(&mut self.final_match),
        }
    }

    /// Every match with its slot, in playing order.
    pub fn matches(&self) -> impl Iterator<Item = (MatchSlot, &Match)> {
        let quarters = self
            .quarter_finals
            .iter()
            .enumerate()
            .map(|(i, m)| (MatchSlot::QuarterFinal(i), m));
        let semis = self
            .semi_finals
            .iter()
            .enumerate()
            .map(|(i, m)| (MatchSlot::SemiFinal(i), m));
        quarters
            .chain(semis)
            .chain(std::iter::once((MatchSlot::ThirdPlace, &self.third_place)))
            .chain(std::iter::once((MatchSlot::Final, &self.final_match)))
    }

    /// Resolve a match id. Explicit ids win over slot keys such as `qf2` or `final`.
    pub fn locate(&self, match_id: &str) -> Option<MatchSlot> {
        let match_id = match_id.trim();
        if match_id.is_empty() {
            return None;
        }
        self.matches()
            .find(|(_, m)| m.match_id.as_deref() == Some(match_id))
            .map(|(slot, _)| slot)
            .or_else(|| MatchSlot::parse(match_id).filter(|slot| self.get(*slot).is_some()))
    }

    /// The id callers should use to address the match in `slot`.
    pub fn match_key(&self, slot: MatchSlot) -> String {
        self.get(slot)
            .and_then(|m| m.match_id.clone())
            .unwrap_or_else(|| slot.key())
    }

    pub fn is_complete(&self) -> bool {
        self.final_match.is_completed() && self.third_place.is_completed()
    }

    pub fn champion(&self) -> Option<&Team> {
        if !self.final_match.is_completed() {
            return None;
        }
        self.final_match.winner.as_ref()
    }

    pub fn podium(&self) -> Option<Podium> {
        if !self.is_complete() {
            return None;
        }
        Some(Podium {
            first: self.final_match.winner.as_ref()?.without_score(),
            second: self.final_match.loser()?.without_score(),
            third: self.third_place.winner.as_ref()?.without_score(),
        })
    }
}
