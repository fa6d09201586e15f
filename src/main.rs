mod app;
mod args;
mod render;
mod state;

use crate::app::Session;
use crate::args::{Args, Command, match_result};
use crate::state::backend::FileBackend;
use crate::state::messages::DrawEvent;
use crate::state::settings::AppSettings;
use anyhow::Context;
use clap::Parser;
use knockout_bracket::cache::{BracketCache, JsonFileStore, SystemClock};
use log::error;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    better_panic::install();

    let args = Args::parse();
    let settings = AppSettings::load(args.data_dir.clone(), args.log_level);
    init_logging(&settings)?;

    let backend = FileBackend::new(settings.tournaments_dir());
    let cache = BracketCache::new(JsonFileStore::new(settings.cache_file()), SystemClock);
    let mut session = Session::new(backend, cache);

    let id = args.command.tournament_id().to_owned();
    if let Err(e) = run(&mut session, args.command).await {
        error!("{id}: {e:#}");
        return Err(e);
    }
    Ok(())
}

fn init_logging(settings: &AppSettings) -> anyhow::Result<()> {
    std::fs::create_dir_all(&settings.data_dir)
        .with_context(|| format!("could not create {}", settings.data_dir.display()))?;
    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} {l} {t} - {m}{n}")))
        .build(settings.log_file())
        .context("could not open log file")?;

    let config = Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(Root::builder().appender("logfile").build(settings.log_level))?;

    log4rs::init_config(config)?;
    Ok(())
}

async fn run(
    session: &mut Session<FileBackend, JsonFileStore, SystemClock>,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Create { id, name, teams } => {
            let name = name.unwrap_or_else(|| id.clone());
            let tournament = session.create(&id, &name, teams).await?;
            print!("{}", render::tournament(&tournament));
        }
        Command::Lock { id } => {
            let tournament = session.lock(&id).await?;
            print!("{}", render::tournament(&tournament));
        }
        Command::Draw { id, seed, pause_ms } => {
            let (_, bracket) = session
                .draw(&id, seed, Duration::from_millis(pause_ms), |event| {
                    if let DrawEvent::Revealed(state) = event {
                        println!("{}", render::draw_step(state));
                    }
                })
                .await?;
            if bracket.is_some() {
                show(session, &id, false).await?;
            }
        }
        Command::Record {
            id,
            match_id,
            score,
            winner,
            mvp,
            scorers,
            assists,
            notes,
        } => {
            let result = match_result(score, winner, mvp, scorers, assists, notes);
            let (outcome, _) = session.record_result(&id, &match_id, &result).await?;
            print!("{}", render::outcome(&outcome));
        }
        Command::Show { id, refresh } => show(session, &id, refresh).await?,
        Command::Stats { id } => {
            let board = session.leaderboard(&id).await?;
            print!("{}", render::leaderboard(&board));
        }
    }
    Ok(())
}

async fn show(
    session: &mut Session<FileBackend, JsonFileStore, SystemClock>,
    id: &str,
    refresh: bool,
) -> anyhow::Result<()> {
    let tournament = session.tournament(id).await?;
    let entry = if refresh {
        session.refresh(id).await?
    } else {
        session.bracket(id).await?
    };
    match entry {
        Some(entry) => print!("{}", render::bracket(&tournament.name, &entry.bracket, &entry.extras)),
        None => print!("{}", render::tournament(&tournament)),
    }
    Ok(())
}
