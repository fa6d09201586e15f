use crate::tournament::Stage;
use std::fmt;

pub type BracketResult<T> = Result<T, BracketError>;

/// Precondition violations. None of these are transient, so none are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BracketError {
    InvalidTeamCount { expected: usize, found: usize },
    IncompleteDraw { selected: usize },
    MatchNotReady(String),
    InvalidWinner { match_id: String, winner_id: String },
    ThirdPlacePending,
    MatchNotFound(String),
    MatchAlreadyCompleted(String),
    InvalidStage { expected: Stage, found: Stage },
    DuplicateTeam(String),
}

impl fmt::Display for BracketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketError::InvalidTeamCount { expected, found } => {
                write!(f, "Invalid team count: expected {expected}, found {found}")
            }
            BracketError::IncompleteDraw { selected } => {
                write!(f, "Incomplete draw: {selected} teams selected")
            }
            BracketError::MatchNotReady(id) => {
                write!(f, "Match {id} is not ready: both teams must be known")
            }
            BracketError::InvalidWinner { match_id, winner_id } => {
                write!(f, "Team {winner_id} is not playing in match {match_id}")
            }
            BracketError::ThirdPlacePending => {
                write!(f, "The third place match must be completed before the final")
            }
            BracketError::MatchNotFound(id) => write!(f, "Match not found: {id}"),
            BracketError::MatchAlreadyCompleted(id) => {
                write!(f, "Match {id} already has a result")
            }
            BracketError::InvalidStage { expected, found } => {
                write!(f, "Tournament is in stage {found}, expected {expected}")
            }
            BracketError::DuplicateTeam(id) => write!(f, "Team {id} is already registered"),
        }
    }
}

impl std::error::Error for BracketError {}
