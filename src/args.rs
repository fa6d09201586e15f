use clap::{ArgAction, Parser, Subcommand};
use knockout_bracket::Team;
use knockout_bracket::results::MatchResult;
use knockout_bracket::stats::PlayerEntry;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(name = "knockout", about = "Eight-team knockout tournaments", author, version, long_about = None)]
pub struct Args {
    #[clap(long, global = true, action = ArgAction::Set, help = "Directory holding tournaments, cache and log")]
    pub data_dir: Option<PathBuf>,
    #[clap(long, short = 'l', global = true, action = ArgAction::Set, help = "Log level (off, error, warn, info, debug, trace)")]
    pub log_level: Option<LevelFilter>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a tournament and its teams
    Create {
        id: String,
        #[clap(long, help = "Display name, defaults to the id")]
        name: Option<String>,
        #[clap(long = "team", short = 't', value_parser = parse_team, help = "Team as ID or ID:NAME, repeat for each team")]
        teams: Vec<Team>,
    },
    /// Close registration
    Lock { id: String },
    /// Draw the quarterfinal pairings
    Draw {
        id: String,
        #[clap(long, action = ArgAction::Set, help = "Seed for a reproducible draw")]
        seed: Option<u64>,
        #[clap(long, default_value_t = 600, help = "Pause between revealed teams in milliseconds")]
        pause_ms: u64,
    },
    /// Record the result of a match
    Record {
        id: String,
        #[clap(help = "Match id or slot key (qf1..qf4, sf1, sf2, third, final)")]
        match_id: String,
        #[clap(long, value_parser = parse_score, help = "Score as TEAM1-TEAM2, e.g. 2-1")]
        score: (u32, u32),
        #[clap(long, help = "Id of the winning team")]
        winner: String,
        #[clap(long, value_parser = parse_player, help = "PLAYER@TEAM")]
        mvp: Option<PlayerEntry>,
        #[clap(long = "scorer", value_parser = parse_player, help = "PLAYER@TEAM[*GOALS], repeatable")]
        scorers: Vec<PlayerEntry>,
        #[clap(long = "assist", value_parser = parse_player, help = "PLAYER@TEAM[*ASSISTS], repeatable")]
        assists: Vec<PlayerEntry>,
        #[clap(long)]
        notes: Option<String>,
    },
    /// Print the current bracket
    Show {
        id: String,
        #[clap(long, action = ArgAction::SetTrue, help = "Skip the cache")]
        refresh: bool,
    },
    /// Print the player leaderboard
    Stats { id: String },
}

impl Command {
    pub fn tournament_id(&self) -> &str {
        match self {
            Command::Create { id, .. }
            | Command::Lock { id }
            | Command::Draw { id, .. }
            | Command::Record { id, .. }
            | Command::Show { id, .. }
            | Command::Stats { id } => id,
        }
    }
}

/// Build the result carried by a `record` command.
pub fn match_result(
    score: (u32, u32),
    winner: String,
    mvp: Option<PlayerEntry>,
    scorers: Vec<PlayerEntry>,
    assists: Vec<PlayerEntry>,
    notes: Option<String>,
) -> MatchResult {
    let mut result = MatchResult::new(score.0, score.1, winner);
    result.mvp = mvp;
    result.scorers = scorers;
    result.assists = assists;
    result.notes = notes;
    result
}

fn parse_team(s: &str) -> Result<Team, String> {
    let (id, name) = match s.split_once(':') {
        Some((id, name)) => (id.trim(), name.trim()),
        None => (s.trim(), s.trim()),
    };
    if id.is_empty() {
        return Err("team id must not be empty".to_string());
    }
    let name = if name.is_empty() { id } else { name };
    Ok(Team::new(id, name))
}

fn parse_score(s: &str) -> Result<(u32, u32), String> {
    let (a, b) = s
        .split_once(['-', ':'])
        .ok_or_else(|| format!("expected TEAM1-TEAM2, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid score {v:?}: {e}"))
    };
    Ok((parse(a)?, parse(b)?))
}

fn parse_player(s: &str) -> Result<PlayerEntry, String> {
    let (entry, count) = match s.rsplit_once('*') {
        Some((entry, count)) => {
            let count = count
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid count in {s:?}: {e}"))?;
            (entry, count)
        }
        None => (s, 1),
    };
    let (player, team) = entry
        .split_once('@')
        .ok_or_else(|| format!("expected PLAYER@TEAM, got {s:?}"))?;
    let (player, team) = (player.trim(), team.trim());
    if player.is_empty() || team.is_empty() {
        return Err(format!("expected PLAYER@TEAM, got {s:?}"));
    }
    Ok(PlayerEntry::new(player, team).times(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teams_take_an_optional_name() {
        assert_eq!(parse_team("T1:Red Lions").unwrap(), Team::new("T1", "Red Lions"));
        assert_eq!(parse_team("T2").unwrap(), Team::new("T2", "T2"));
        assert!(parse_team(":nameless").is_err());
    }

    #[test]
    fn scores_and_players() {
        assert_eq!(parse_score("2-1"), Ok((2, 1)));
        assert_eq!(parse_score("0:0"), Ok((0, 0)));
        assert!(parse_score("two-one").is_err());

        let p = parse_player("p7@T3*2").unwrap();
        assert_eq!((p.player_id.as_str(), p.team_id.as_str(), p.count), ("p7", "T3", 2));
        assert_eq!(parse_player("p1@T1").unwrap().count, 1);
        assert!(parse_player("p1").is_err());
    }

    #[test]
    fn record_command_parses() {
        let args = Args::try_parse_from([
            "knockout", "record", "cup", "qf1", "--score", "2-1", "--winner", "T1",
            "--scorer", "p1@T1*2", "--scorer", "p4@T8", "--mvp", "p1@T1",
        ])
        .unwrap();
        let Command::Record { score, scorers, mvp, .. } = &args.command else {
            panic!("expected record");
        };
        assert_eq!(*score, (2, 1));
        assert_eq!(scorers.len(), 2);
        assert!(mvp.is_some());
        assert_eq!(args.command.tournament_id(), "cup");
    }

    #[test]
    fn globals_come_after_the_subcommand_too() {
        let args = Args::try_parse_from(["knockout", "show", "cup", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level, Some(LevelFilter::Debug));
    }
}
