use crate::wire::{self, array_field, field, text_field, u32_field};
use crate::{Bracket, Match, MatchStatus, QUARTER_FINAL_COUNT, SEMI_FINAL_COUNT, Team};
use log::debug;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Untyped backend payload → canonical Bracket
// ---------------------------------------------------------------------------

/// Coerce a bracket payload into the canonical 8-team shape.
///
/// `None` (or JSON `null`) means there is no bracket yet. Anything else yields a
/// bracket with at least four quarterfinals and two semifinals; short rounds are
/// padded with empty placeholders and longer rounds are kept whole. Malformed
/// fields degrade to empty slots, this never fails.
pub fn normalize_bracket(raw: Option<&Value>) -> Option<Bracket> {
    let raw = raw.filter(|v| !v.is_null())?;

    let quarter_finals = normalize_round(array_field(raw, wire::QUARTER_FINAL_KEYS), QUARTER_FINAL_COUNT);
    let semi_finals = normalize_round(array_field(raw, wire::SEMI_FINAL_KEYS), SEMI_FINAL_COUNT);
    let final_match = field(raw, wire::FINAL_KEYS)
        .map(|m| normalize_match(m, None))
        .unwrap_or_default();
    let third_place = field(raw, wire::THIRD_PLACE_KEYS)
        .map(|m| normalize_match(m, None))
        .unwrap_or_default();

    Some(Bracket {
        quarter_finals,
        semi_finals,
        final_match,
        third_place,
    })
}

/// Parse a JSON document and normalize it. Unparseable text reads as "no bracket".
pub fn normalize_bracket_str(raw: &str) -> Option<Bracket> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => normalize_bracket(Some(&value)),
        Err(e) => {
            debug!("bracket payload is not json: {e}");
            None
        }
    }
}

fn normalize_round(entries: &[Value], required: usize) -> Vec<Match> {
    let mut matches: Vec<Match> = entries
        .iter()
        .enumerate()
        .map(|(i, m)| normalize_match(m, Some(i as u32 + 1)))
        .collect();

    if matches.len() < required {
        debug!("padding round from {} to {required} matches", matches.len());
        let padding = (matches.len()..required).map(|i| Match::placeholder(i as u32 + 1));
        matches.extend(padding);
    }
    matches
}

fn normalize_match(raw: &Value, position: Option<u32>) -> Match {
    let team1 = field(raw, wire::TEAM1_KEYS).and_then(normalize_team);
    let team2 = field(raw, wire::TEAM2_KEYS).and_then(normalize_team);

    // Winners arrive as a full team, a bare id, or a separate winnerId field.
    let winner_id = field(raw, wire::WINNER_KEYS)
        .and_then(normalize_team)
        .map(|t| t.team_id)
        .or_else(|| text_field(raw, wire::WINNER_ID_KEYS));

    // Keep the slot's own copy of the winner so scores and names agree.
    let winner = winner_id.and_then(|id| {
        [team1.as_ref(), team2.as_ref()]
            .into_iter()
            .flatten()
            .find(|t| t.is(&id))
            .cloned()
    });

    let status = match text_field(raw, wire::STATUS_KEYS).as_deref().map(parse_status) {
        Some(MatchStatus::Pending) => MatchStatus::Pending,
        // Completed (or unstated with a known winner) only holds if the winner is in the match.
        Some(MatchStatus::Completed) | None if winner.is_some() => MatchStatus::Completed,
        _ => MatchStatus::Pending,
    };

    Match {
        match_id: text_field(raw, wire::MATCH_ID_KEYS),
        number: u32_field(raw, wire::MATCH_NUMBER_KEYS).or(position),
        team1,
        team2,
        winner: if status == MatchStatus::Completed { winner } else { None },
        status,
    }
}

fn normalize_team(raw: &Value) -> Option<Team> {
    // Some backends reference teams by id only.
    if let Some(id) = wire::as_text(raw) {
        return Some(Team::new(id.clone(), id));
    }

    let team_id = text_field(raw, wire::TEAM_ID_KEYS)?;
    let name = text_field(raw, wire::TEAM_NAME_KEYS).unwrap_or_else(|| team_id.clone());
    Some(Team {
        name,
        logo: text_field(raw, wire::TEAM_LOGO_KEYS),
        score: u32_field(raw, wire::TEAM_SCORE_KEYS),
        team_id,
    })
}

fn parse_status(s: &str) -> MatchStatus {
    match s.to_ascii_lowercase().as_str() {
        "completed" | "complete" | "finished" | "final" | "done" => MatchStatus::Completed,
        _ => MatchStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_and_absent_mean_no_bracket() {
        assert!(normalize_bracket(None).is_none());
        assert!(normalize_bracket(Some(&Value::Null)).is_none());
        assert!(normalize_bracket_str("not json").is_none());
    }

    #[test]
    fn empty_object_is_fully_padded() {
        let bracket = normalize_bracket(Some(&json!({}))).unwrap();
        assert_eq!(bracket.quarter_finals.len(), 4);
        assert_eq!(bracket.semi_finals.len(), 2);
        assert_eq!(bracket.quarter_finals[3], Match::placeholder(4));
        assert_eq!(bracket.final_match, Match::default());
        assert_eq!(bracket.third_place.status, MatchStatus::Pending);
    }

    #[test]
    fn lowercase_round_keys_are_accepted() {
        let raw = json!({
            "quarterfinals": [{ "matchId": "q1", "team1": { "teamId": "a", "name": "A" } }],
            "semifinals": [{ "matchId": "s1" }, { "matchId": "s2" }, { "matchId": "s3" }],
        });
        let bracket = normalize_bracket(Some(&raw)).unwrap();
        assert_eq!(bracket.quarter_finals.len(), 4);
        assert_eq!(bracket.quarter_finals[0].match_id.as_deref(), Some("q1"));
        assert_eq!(bracket.quarter_finals[0].team1.as_ref().unwrap().name, "A");
        assert!(bracket.quarter_finals[0].team2.is_none());
        assert_eq!(bracket.quarter_finals[1].number, Some(2));
        // Extra semifinals are kept, not truncated.
        assert_eq!(bracket.semi_finals.len(), 3);
    }

    #[test]
    fn completed_without_valid_winner_is_pending() {
        let raw = json!({
            "final": {
                "team1": { "teamId": "a" },
                "team2": { "teamId": "b" },
                "winner": { "teamId": "zzz" },
                "status": "completed"
            }
        });
        let bracket = normalize_bracket(Some(&raw)).unwrap();
        assert_eq!(bracket.final_match.status, MatchStatus::Pending);
        assert!(bracket.final_match.winner.is_none());
    }

    #[test]
    fn winner_resolves_to_slot_team() {
        let raw = json!({
            "thirdPlace": {
                "_id": 77,
                "team1": { "_id": 1, "name": "One", "score": "2" },
                "team2": { "team_id": "2", "teamName": "Two", "score": 1 },
                "winnerId": 1
            }
        });
        let bracket = normalize_bracket(Some(&raw)).unwrap();
        let third = &bracket.third_place;
        assert_eq!(third.match_id.as_deref(), Some("77"));
        assert_eq!(third.status, MatchStatus::Completed);
        assert_eq!(third.winner.as_ref().unwrap().name, "One");
        assert_eq!(third.winner.as_ref().unwrap().score, Some(2));
        assert_eq!(third.team2.as_ref().unwrap().name, "Two");
    }

    #[test]
    fn garbage_never_panics() {
        for raw in [
            json!(5),
            json!("bracket"),
            json!([1, 2, 3]),
            json!({ "quarterFinals": "nope", "semiFinals": [null, 3, "x"], "final": [] }),
            json!({ "quarterFinals": [{ "team1": [], "team2": { "teamId": {} }, "status": 9 }] }),
        ] {
            let bracket = normalize_bracket(Some(&raw)).unwrap();
            assert!(bracket.quarter_finals.len() >= 4);
            assert!(bracket.semi_finals.len() >= 2);
        }
    }
}
