use crate::state::backend::TournamentBackend;
use crate::state::messages::DrawEvent;
use crate::state::reveal::DrawRevealer;
use anyhow::{Context, Result, anyhow, bail};
use knockout_bracket::cache::{BracketCache, CacheEntry, CacheExtras, CacheStore, Clock};
use knockout_bracket::normalize::normalize_bracket;
use knockout_bracket::results::{MatchResult, ResultOutcome};
use knockout_bracket::stats::Leaderboard;
use knockout_bracket::tournament::{DrawCommit, Tournament};
use knockout_bracket::{Bracket, Team};
use log::{debug, error, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tokio::sync::mpsc;

/// Client side of a tournament: reads go through the bracket cache, writes go
/// to the backend of record followed by one re-fetch.
pub struct Session<B, S, C> {
    backend: B,
    cache: BracketCache<S, C>,
}

impl<B: TournamentBackend, S: CacheStore, C: Clock> Session<B, S, C> {
    pub fn new(backend: B, cache: BracketCache<S, C>) -> Self {
        Self { backend, cache }
    }

    pub async fn create(&mut self, id: &str, name: &str, teams: Vec<Team>) -> Result<Tournament> {
        let mut tournament = Tournament::new(id, name);
        for team in teams {
            tournament
                .register_team(team)
                .map_err(|e| anyhow!("cannot register team: {e}"))?;
        }
        self.backend.create_tournament(&tournament).await?;
        Ok(tournament)
    }

    pub async fn tournament(&self, id: &str) -> Result<Tournament> {
        self.backend
            .fetch_tournament(id)
            .await
            .with_context(|| format!("could not load tournament {id}"))
    }

    pub async fn lock(&mut self, id: &str) -> Result<Tournament> {
        let mut tournament = self.tournament(id).await?;
        tournament.lock().map_err(|e| anyhow!("cannot lock {id}: {e}"))?;
        self.backend.save_tournament(&tournament).await?;
        Ok(tournament)
    }

    /// The current bracket, from the cache when fresh, otherwise fetched.
    /// `None` until the draw has been made.
    pub async fn bracket(&mut self, id: &str) -> Result<Option<CacheEntry>> {
        if let Some(entry) = self.cache.get_entry(id) {
            return Ok(Some(entry));
        }
        self.refresh(id).await
    }

    /// Fetch from the backend of record, normalize and re-populate the cache.
    pub async fn refresh(&mut self, id: &str) -> Result<Option<CacheEntry>> {
        let raw = self.backend.fetch_bracket(id).await?;
        let Some(bracket) = normalize_bracket(raw.as_ref()) else {
            debug!("no bracket stored for {id} yet");
            return Ok(None);
        };
        let tournament = self.tournament(id).await?;
        let extras = CacheExtras {
            stage: Some(tournament.stage),
            draw_completed: tournament.draw_completed,
            champion: tournament.champion,
            podium: tournament.podium,
        };
        if let Err(e) = self.cache.put(id, bracket.clone(), extras.clone()) {
            error!("could not cache bracket for {id}: {e}");
        }
        Ok(Some(CacheEntry {
            bracket,
            extras,
            stored_at: self.cache.now(),
        }))
    }

    /// Run the draw, revealing one team per `pause`, then store it and re-fetch.
    /// The draw is only stored once all eight teams are out of the pot.
    pub async fn draw(
        &mut self,
        id: &str,
        seed: Option<u64>,
        pause: Duration,
        mut on_event: impl FnMut(&DrawEvent),
    ) -> Result<(DrawCommit, Option<Bracket>)> {
        let mut tournament = self.tournament(id).await?;
        let seed = seed.unwrap_or_else(rand::random);
        debug!("drawing {id} with seed {seed}");
        let sequence = tournament
            .start_draw(ChaCha8Rng::seed_from_u64(seed))
            .map_err(|e| anyhow!("cannot draw {id}: {e}"))?;

        let (tx, mut rx) = mpsc::channel::<DrawEvent>(16);
        let reveal = tokio::spawn(DrawRevealer::new(sequence, tx, pause).run());

        let mut order = None;
        while let Some(event) = rx.recv().await {
            on_event(&event);
            match event {
                DrawEvent::Revealed(_) => {}
                DrawEvent::Finished(o) => order = Some(o),
                DrawEvent::Failed(e) => bail!("draw for {id} failed: {e}"),
            }
        }
        reveal.await.context("draw task stopped unexpectedly")?;
        let order = order.ok_or_else(|| anyhow!("draw for {id} ended before all teams were drawn"))?;

        let commit = tournament
            .commit_draw(&order)
            .map_err(|e| anyhow!("cannot commit draw for {id}: {e}"))?;
        self.backend
            .persist_draw(id, &commit)
            .await
            .inspect_err(|e| error!("storing draw for {id} failed: {e:#}"))?;
        info!("draw for {id} stored");

        if let Err(e) = self.cache.invalidate(id) {
            error!("could not invalidate cached bracket for {id}: {e}");
        }
        let bracket = self.refresh(id).await?.map(|entry| entry.bracket);
        Ok((commit, bracket))
    }

    /// Record a result: validate locally, store it, then re-fetch the
    /// authoritative bracket once.
    pub async fn record_result(
        &mut self,
        id: &str,
        match_id: &str,
        result: &MatchResult,
    ) -> Result<(ResultOutcome, Option<Bracket>)> {
        let entry = self
            .bracket(id)
            .await?
            .ok_or_else(|| anyhow!("tournament {id} has no bracket yet; run the draw first"))?;
        let outcome = self
            .cache
            .record_result(id, &entry.bracket, match_id, result)
            .map_err(|e| anyhow!("cannot record {match_id}: {e}"))?;

        self.backend
            .persist_result(id, match_id, result)
            .await
            .inspect_err(|e| error!("storing result for {id}/{match_id} failed: {e:#}"))?;
        info!("result for {id}/{match_id} stored");

        let bracket = self.refresh(id).await?.map(|entry| entry.bracket);
        Ok((outcome, bracket))
    }

    pub async fn leaderboard(&self, id: &str) -> Result<Leaderboard> {
        let stats = self.backend.fetch_stats(id).await?;
        Ok(Leaderboard::from_stats(&stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::backend::FileBackend;
    use knockout_bracket::MatchStatus;
    use chrono::{TimeDelta, TimeZone, Utc};
    use knockout_bracket::cache::{ManualClock, MemoryStore, SystemClock};
    use knockout_bracket::stats::PlayerEntry;
    use knockout_bracket::tournament::Stage;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("knockout-session-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn session(dir: &PathBuf) -> Session<FileBackend, MemoryStore, SystemClock> {
        Session::new(FileBackend::new(dir), BracketCache::default())
    }

    fn teams() -> Vec<Team> {
        (1..=8).map(|i| Team::new(format!("T{i}"), format!("Team {i}"))).collect()
    }

    async fn drawn(session: &mut Session<FileBackend, MemoryStore, SystemClock>) -> Bracket {
        session.create("cup", "Club Cup", teams()).await.unwrap();
        session.lock("cup").await.unwrap();
        let (_, bracket) = session.draw("cup", Some(7), Duration::ZERO, |_| {}).await.unwrap();
        bracket.unwrap()
    }

    /// Play the remaining matches in order, team1 always winning.
    async fn play_out(session: &mut Session<FileBackend, MemoryStore, SystemClock>) -> Bracket {
        let keys = ["qf1", "qf2", "qf3", "qf4", "sf1", "sf2", "third", "final"];
        let mut last = None;
        for key in keys {
            let entry = session.bracket("cup").await.unwrap().unwrap();
            let slot = entry.bracket.locate(key).unwrap();
            let winner = entry.bracket.get(slot).unwrap().team1.clone().unwrap();
            let (_, bracket) = session
                .record_result("cup", key, &MatchResult::new(2, 1, winner.team_id))
                .await
                .unwrap();
            last = bracket;
        }
        last.unwrap()
    }

    #[tokio::test]
    async fn bracket_is_absent_before_the_draw() {
        let dir = temp_dir("absent");
        let mut session = session(&dir);
        session.create("cup", "Club Cup", teams()).await.unwrap();
        assert!(session.bracket("cup").await.unwrap().is_none());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn draw_reveals_every_team_and_seeds_the_bracket() {
        let dir = temp_dir("draw");
        let mut session = session(&dir);
        session.create("cup", "Club Cup", teams()).await.unwrap();
        session.lock("cup").await.unwrap();

        let mut revealed = 0;
        let (commit, bracket) = session
            .draw("cup", Some(3), Duration::ZERO, |event| {
                if let DrawEvent::Revealed(_) = event {
                    revealed += 1;
                }
            })
            .await
            .unwrap();

        assert_eq!(revealed, 8);
        assert_eq!(commit.stage, Stage::Knockout);
        let bracket = bracket.unwrap();
        assert_eq!(
            bracket.quarter_finals[0].team1.as_ref().unwrap().team_id,
            commit.team_order[0]
        );
        assert!(session.draw("cup", Some(3), Duration::ZERO, |_| {}).await.is_err());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn same_seed_gives_same_order() {
        let (a, b) = (temp_dir("seed-a"), temp_dir("seed-b"));
        let first = drawn(&mut session(&a)).await;
        let second = drawn(&mut session(&b)).await;
        assert_eq!(first, second);
        let _ = std::fs::remove_dir_all(a);
        let _ = std::fs::remove_dir_all(b);
    }

    #[tokio::test]
    async fn results_are_stored_and_refetched() {
        let dir = temp_dir("result");
        let mut session = session(&dir);
        let bracket = drawn(&mut session).await;
        let winner = bracket.quarter_finals[0].team2.clone().unwrap();

        let result = MatchResult::new(0, 1, winner.team_id.clone())
            .with_scorer(PlayerEntry::new("p9", winner.team_id.clone()));
        let (outcome, refreshed) = session.record_result("cup", "qf1", &result).await.unwrap();
        let refreshed = refreshed.unwrap();
        assert_eq!(refreshed, outcome.bracket);
        assert_eq!(refreshed.quarter_finals[0].status, MatchStatus::Completed);
        assert_eq!(refreshed.semi_finals[0].team1.as_ref().unwrap().team_id, winner.team_id);

        let again = session.record_result("cup", "qf1", &result).await;
        assert!(again.is_err());
        let board = session.leaderboard("cup").await.unwrap();
        assert_eq!(board.top_scorers()[0].player_id, "p9");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn final_waits_for_third_place_then_finishes() {
        let dir = temp_dir("final");
        let mut session = session(&dir);
        drawn(&mut session).await;
        for key in ["qf1", "qf2", "qf3", "qf4", "sf1", "sf2"] {
            let entry = session.bracket("cup").await.unwrap().unwrap();
            let slot = entry.bracket.locate(key).unwrap();
            let winner = entry.bracket.get(slot).unwrap().team1.clone().unwrap();
            session
                .record_result("cup", key, &MatchResult::new(1, 0, winner.team_id))
                .await
                .unwrap();
        }
        let entry = session.bracket("cup").await.unwrap().unwrap();
        let finalist = entry.bracket.final_match.team1.clone().unwrap();
        assert!(
            session
                .record_result("cup", "final", &MatchResult::new(1, 0, finalist.team_id))
                .await
                .is_err()
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn finished_tournament_caches_the_podium() {
        let dir = temp_dir("podium");
        let mut session = session(&dir);
        drawn(&mut session).await;
        let bracket = play_out(&mut session).await;
        assert!(bracket.is_complete());

        let entry = session.bracket("cup").await.unwrap().unwrap();
        assert_eq!(entry.extras.stage, Some(Stage::Finished));
        let podium = entry.extras.podium.unwrap();
        assert_eq!(Some(&podium.first), entry.extras.champion.as_ref());
        assert_eq!(session.tournament("cup").await.unwrap().stage, Stage::Finished);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn refreshed_entry_uses_the_session_clock() {
        let dir = temp_dir("clock");
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();
        let clock = ManualClock::at(now);
        let mut session = Session::new(
            FileBackend::new(&dir),
            BracketCache::new(MemoryStore::default(), clock.clone()),
        );
        session.create("cup", "Club Cup", teams()).await.unwrap();
        session.lock("cup").await.unwrap();
        session.draw("cup", Some(1), Duration::ZERO, |_| {}).await.unwrap();

        clock.advance(TimeDelta::seconds(90));
        let fetched = session.bracket("cup").await.unwrap().unwrap();
        assert_eq!(fetched.stored_at, now + TimeDelta::seconds(90));
        let cached = session.bracket("cup").await.unwrap().unwrap();
        assert_eq!(cached.stored_at, fetched.stored_at);
        let _ = std::fs::remove_dir_all(dir);
    }
}
