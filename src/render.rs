use knockout_bracket::cache::CacheExtras;
use knockout_bracket::draw::DrawState;
use knockout_bracket::results::ResultOutcome;
use knockout_bracket::stats::{Leaderboard, PlayerTally};
use knockout_bracket::tournament::Tournament;
use knockout_bracket::{Bracket, Match, MatchSlot, Podium, TEAM_COUNT, Team};
use std::fmt::Write;

const TBD: &str = "TBD";
const NAME_WIDTH: usize = 18;

// ---------------------------------------------------------------------------
// Bracket
// ---------------------------------------------------------------------------

pub fn bracket(title: &str, bracket: &Bracket, extras: &CacheExtras) -> String {
    let mut out = String::new();
    let stage = extras.stage.map(|s| s.label()).unwrap_or("unknown");
    let _ = writeln!(out, "{title} [{stage}]");

    let mut round = "";
    for (slot, m) in bracket.matches() {
        let heading = round_heading(slot);
        if heading != round {
            round = heading;
            let _ = writeln!(out, "\n{heading}");
        }
        let _ = writeln!(out, "  {:<6} {}", bracket.match_key(slot), match_line(m));
    }

    if let Some(podium) = &extras.podium {
        out.push('\n');
        out.push_str(&self::podium(podium));
    } else if let Some(champion) = &extras.champion {
        let _ = writeln!(out, "\nChampion: {}", champion.name);
    }
    out
}

fn round_heading(slot: MatchSlot) -> &'static str {
    match slot {
        MatchSlot::QuarterFinal(_) => "Quarterfinals",
        MatchSlot::SemiFinal(_) => "Semifinals",
        MatchSlot::ThirdPlace => "Third place",
        MatchSlot::Final => "Final",
    }
}

fn team_cell(team: Option<&Team>) -> String {
    let name = team.map(|t| t.name.as_str()).unwrap_or(TBD);
    format!("{name:<NAME_WIDTH$}")
}

fn score_cell(team: Option<&Team>) -> String {
    team.and_then(|t| t.score)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn match_line(m: &Match) -> String {
    let (team1, team2) = (m.team1.as_ref(), m.team2.as_ref());
    match &m.winner {
        Some(winner) if m.is_completed() => format!(
            "{} {:>2} : {:<2} {}  winner {}",
            team_cell(team1),
            score_cell(team1),
            score_cell(team2),
            team_cell(team2).trim_end(),
            winner.name
        ),
        _ => format!("{} vs {}", team_cell(team1), team_cell(team2).trim_end()),
    }
}

pub fn podium(podium: &Podium) -> String {
    format!(
        "Podium\n  1. {}\n  2. {}\n  3. {}\n",
        podium.first.name, podium.second.name, podium.third.name
    )
}

// ---------------------------------------------------------------------------
// Tournament, draw and results
// ---------------------------------------------------------------------------

pub fn tournament(t: &Tournament) -> String {
    let mut out = format!("{} ({}) [{}]\n", t.name, t.id, t.stage);
    let _ = writeln!(out, "Teams {}/{TEAM_COUNT}", t.teams.len());
    for team in &t.teams {
        let _ = writeln!(out, "  {:<10} {}", team.team_id, team.name);
    }
    out
}

pub fn draw_step(state: &DrawState) -> String {
    let position = state.selected_teams.len();
    match state.last_drawn() {
        Some(team) => format!(
            "{position}/{TEAM_COUNT}  {} ({}), {} left",
            team.name,
            team.team_id,
            state.remaining_teams.len()
        ),
        None => format!("0/{TEAM_COUNT}"),
    }
}

pub fn outcome(outcome: &ResultOutcome) -> String {
    let mut out = String::new();
    let key = outcome.bracket.match_key(outcome.slot);
    if let Some(m) = outcome.bracket.get(outcome.slot) {
        let _ = writeln!(out, "{} {}", key, match_line(m));
    }
    if let Some((next, _)) = outcome.slot.winner_advances_to() {
        let _ = writeln!(out, "Winner moves on to {}", next.label());
    }
    if let Some((next, _)) = outcome.slot.loser_drops_to() {
        let _ = writeln!(out, "Loser plays for {}", next.label());
    }
    if let Some(podium) = &outcome.podium {
        out.push_str(&self::podium(podium));
    }
    out
}

// ---------------------------------------------------------------------------
// Player statistics
// ---------------------------------------------------------------------------

pub fn leaderboard(board: &Leaderboard) -> String {
    if board.is_empty() {
        return "No player statistics recorded yet.\n".to_string();
    }
    let mut out = String::new();
    section(&mut out, "Top scorers", &board.top_scorers(), |t| t.goals);
    section(&mut out, "Assists", &board.top_assists(), |t| t.assists);
    section(&mut out, "MVP awards", &board.mvp_awards(), |t| t.mvp_awards);
    out
}

fn section(out: &mut String, title: &str, rows: &[&PlayerTally], count: impl Fn(&PlayerTally) -> u32) {
    if rows.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}");
    for (rank, row) in rows.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {:<NAME_WIDTH$} {:<10} {}",
            rank + 1,
            row.name,
            row.team_id,
            count(row)
        );
    }
}
