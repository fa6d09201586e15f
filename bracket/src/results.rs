use crate::stats::{MatchStats, PlayerEntry, check_player_stats};
use crate::{Bracket, BracketError, BracketResult, MatchSlot, MatchStatus, Podium, Side, Team};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// A reported match result. The caller names the winner; ties must be settled
/// (penalties, replay) before reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub team1_score: u32,
    pub team2_score: u32,
    pub winner_id: String,
    #[serde(default)]
    pub mvp: Option<PlayerEntry>,
    #[serde(default)]
    pub scorers: Vec<PlayerEntry>,
    #[serde(default)]
    pub assists: Vec<PlayerEntry>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MatchResult {
    pub fn new(team1_score: u32, team2_score: u32, winner_id: impl Into<String>) -> Self {
        Self {
            team1_score,
            team2_score,
            winner_id: winner_id.into(),
            mvp: None,
            scorers: Vec::new(),
            assists: Vec::new(),
            notes: None,
        }
    }

    pub fn with_scorer(mut self, entry: PlayerEntry) -> Self {
        self.scorers.push(entry);
        self
    }

    pub fn with_assist(mut self, entry: PlayerEntry) -> Self {
        self.assists.push(entry);
        self
    }

    pub fn with_mvp(mut self, entry: PlayerEntry) -> Self {
        self.mvp = Some(entry);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Everything that follows from recording one result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultOutcome {
    pub bracket: Bracket,
    pub slot: MatchSlot,
    pub tournament_finished: bool,
    pub champion: Option<Team>,
    pub podium: Option<Podium>,
    pub stats: MatchStats,
}

/// Record `result` for the match addressed by `match_id` and return the next bracket.
///
/// The input bracket is never modified. Winners move into the next round, and
/// semifinal losers fill the third-place match. The final is only accepted
/// once third place has been decided.
pub fn record_result(
    bracket: &Bracket,
    match_id: &str,
    result: &MatchResult,
) -> BracketResult<ResultOutcome> {
    let slot = bracket
        .locate(match_id)
        .ok_or_else(|| BracketError::MatchNotFound(match_id.to_owned()))?;
    let current = bracket
        .get(slot)
        .ok_or_else(|| BracketError::MatchNotFound(match_id.to_owned()))?;

    if !current.is_ready() {
        return Err(BracketError::MatchNotReady(match_id.to_owned()));
    }
    if current.is_completed() {
        return Err(BracketError::MatchAlreadyCompleted(match_id.to_owned()));
    }
    if slot == MatchSlot::Final && !bracket.third_place.is_completed() {
        return Err(BracketError::ThirdPlacePending);
    }
    let winner_side = current
        .side_of(&result.winner_id)
        .ok_or_else(|| BracketError::InvalidWinner {
            match_id: match_id.to_owned(),
            winner_id: result.winner_id.clone(),
        })?;

    for issue in check_player_stats(current, result) {
        warn!(
            "{:?} {} in match {match_id} is listed for team {}, which is not playing",
            issue.role, issue.player_id, issue.team_id
        );
    }

    let mut next = bracket.clone();
    let (winner, loser) = {
        let m = next
            .get_mut(slot)
            .ok_or_else(|| BracketError::MatchNotFound(match_id.to_owned()))?;
        if let Some(team) = m.team1.as_mut() {
            team.score = Some(result.team1_score);
        }
        if let Some(team) = m.team2.as_mut() {
            team.score = Some(result.team2_score);
        }
        m.winner = m.team(winner_side).cloned();
        m.status = MatchStatus::Completed;
        let loser_side = match winner_side {
            Side::Team1 => Side::Team2,
            Side::Team2 => Side::Team1,
        };
        (m.team(winner_side).cloned(), m.team(loser_side).cloned())
    };

    if let (Some((to, side)), Some(team)) = (slot.winner_advances_to(), winner.as_ref()) {
        place(&mut next, to, side, team);
    }
    if let (Some((to, side)), Some(team)) = (slot.loser_drops_to(), loser.as_ref()) {
        place(&mut next, to, side, team);
    }

    let tournament_finished = slot == MatchSlot::Final;
    let (champion, podium) = if tournament_finished {
        (next.champion().map(Team::without_score), next.podium())
    } else {
        (None, None)
    };

    Ok(ResultOutcome {
        stats: MatchStats::from_result(bracket.match_key(slot), result),
        bracket: next,
        slot,
        tournament_finished,
        champion,
        podium,
    })
}

fn place(bracket: &mut Bracket, slot: MatchSlot, side: Side, team: &Team) {
    let Some(m) = bracket.get_mut(slot) else {
        debug!("no {} slot to receive {}", slot.label(), team.team_id);
        return;
    };
    // A played match keeps its teams, or its winner would no longer be one of them.
    if m.is_completed() {
        if m.team(side).is_none_or(|t| !t.is(&team.team_id)) {
            warn!(
                "{} already has a result; not moving {} into it",
                slot.label(),
                team.team_id
            );
        }
        return;
    }
    debug!("{} advances to {} ({side:?})", team.team_id, slot.label());
    *m.slot_mut(side) = Some(team.without_score());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Match;
    use crate::normalize::normalize_bracket;
    use serde_json::json;

    fn quarterfinal_bracket() -> Bracket {
        let mut bracket = Bracket::empty();
        for i in 0..4 {
            bracket.quarter_finals[i] = Match::between(
                format!("q{i}"),
                Team::new(format!("a{i}"), "A"),
                Team::new(format!("b{i}"), "B"),
            );
        }
        bracket
    }

    #[test]
    fn scores_and_winner_are_written() {
        let bracket = quarterfinal_bracket();
        let outcome = record_result(&bracket, "q2", &MatchResult::new(0, 3, "b2")).unwrap();
        let m = &outcome.bracket.quarter_finals[2];
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.team1.as_ref().unwrap().score, Some(0));
        assert_eq!(m.winner.as_ref().unwrap().team_id, "b2");
        assert_eq!(m.winner.as_ref().unwrap().score, Some(3));
        // Advancing teams start the next match without a score.
        let sf = &outcome.bracket.semi_finals[1];
        assert_eq!(sf.team1.as_ref().unwrap().team_id, "b2");
        assert_eq!(sf.team1.as_ref().unwrap().score, None);
        assert!(!outcome.tournament_finished);
        assert_eq!(outcome.stats.match_id, "q2");
        // Input untouched.
        assert_eq!(bracket, quarterfinal_bracket());
    }

    #[test]
    fn unknown_match_is_not_found() {
        let err = record_result(&quarterfinal_bracket(), "nope", &MatchResult::new(1, 0, "a0"));
        assert_eq!(err, Err(BracketError::MatchNotFound("nope".into())));
    }

    #[test]
    fn empty_slot_is_not_ready() {
        let err = record_result(&quarterfinal_bracket(), "sf1", &MatchResult::new(1, 0, "a0"));
        assert_eq!(err, Err(BracketError::MatchNotReady("sf1".into())));
    }

    #[test]
    fn winner_must_be_playing() {
        let err = record_result(&quarterfinal_bracket(), "q0", &MatchResult::new(1, 0, "a1"));
        assert_eq!(
            err,
            Err(BracketError::InvalidWinner {
                match_id: "q0".into(),
                winner_id: "a1".into()
            })
        );
    }

    #[test]
    fn completed_match_rejects_resubmission() {
        let bracket = quarterfinal_bracket();
        let once = record_result(&bracket, "q0", &MatchResult::new(1, 0, "a0")).unwrap();
        let twice = record_result(&once.bracket, "q0", &MatchResult::new(0, 1, "b0"));
        assert_eq!(twice, Err(BracketError::MatchAlreadyCompleted("q0".into())));
    }

    fn team_json(id: &str) -> serde_json::Value {
        json!({ "teamId": id, "name": id })
    }

    #[test]
    fn extra_semifinal_does_not_feed_the_final() {
        let raw = json!({
            "semiFinals": [
                { "matchId": "s1", "team1": team_json("A"), "team2": team_json("B"),
                  "winner": team_json("A"), "status": "completed" },
                { "matchId": "s2" },
                { "matchId": "s3", "team1": team_json("E"), "team2": team_json("F") }
            ],
            "final": { "team1": team_json("A") },
            "thirdPlace": { "team1": team_json("B") }
        });
        let bracket = normalize_bracket(Some(&raw)).unwrap();
        let outcome = record_result(&bracket, "s3", &MatchResult::new(2, 0, "E")).unwrap();

        assert_eq!(outcome.slot, MatchSlot::SemiFinal(2));
        assert_eq!(outcome.bracket.semi_finals[2].status, MatchStatus::Completed);
        assert_eq!(outcome.bracket.final_match, bracket.final_match);
        assert_eq!(outcome.bracket.third_place, bracket.third_place);
        assert!(!outcome.tournament_finished);
    }

    #[test]
    fn extra_quarterfinal_does_not_feed_an_extra_semifinal() {
        let mut bracket = quarterfinal_bracket();
        bracket.quarter_finals.push(Match::between("q4", Team::new("x", "X"), Team::new("y", "Y")));
        bracket.semi_finals.push(Match::default());
        let outcome = record_result(&bracket, "q4", &MatchResult::new(1, 0, "x")).unwrap();
        assert_eq!(outcome.bracket.semi_finals, bracket.semi_finals);
    }

    #[test]
    fn completed_next_match_keeps_its_teams() {
        let raw = json!({
            "quarterFinals": [
                { "matchId": "q1", "team1": team_json("A"), "team2": team_json("X") }
            ],
            "semiFinals": [
                { "matchId": "s1", "team1": team_json("Z"), "team2": team_json("B"),
                  "winner": team_json("Z"), "status": "completed" }
            ]
        });
        let bracket = normalize_bracket(Some(&raw)).unwrap();
        let outcome = record_result(&bracket, "q1", &MatchResult::new(1, 0, "A")).unwrap();

        let sf = &outcome.bracket.semi_finals[0];
        assert_eq!(sf, &bracket.semi_finals[0]);
        assert!(sf.winner.as_ref().is_some_and(|w| sf.involves(&w.team_id)));
        assert_eq!(outcome.bracket.quarter_finals[0].status, MatchStatus::Completed);
    }

    #[test]
    fn slot_keys_address_matches_without_ids() {
        let mut bracket = quarterfinal_bracket();
        bracket.quarter_finals[1].match_id = None;
        let outcome = record_result(&bracket, "qf2", &MatchResult::new(2, 2, "a1")).unwrap();
        assert_eq!(outcome.slot, MatchSlot::QuarterFinal(1));
        assert_eq!(outcome.stats.match_id, "qf2");
        assert_eq!(
            outcome.bracket.semi_finals[0].team2.as_ref().unwrap().team_id,
            "a1"
        );
    }
}
