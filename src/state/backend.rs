use anyhow::{Context, Result, anyhow, bail};
use knockout_bracket::results::MatchResult;
use knockout_bracket::stats::MatchStats;
use knockout_bracket::tournament::{DrawCommit, Tournament};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Backend of record for tournaments. Whatever it stores is authoritative;
/// clients re-fetch from it after every mutation.
pub trait TournamentBackend {
    async fn create_tournament(&self, tournament: &Tournament) -> Result<()>;
    async fn save_tournament(&self, tournament: &Tournament) -> Result<()>;
    async fn fetch_tournament(&self, id: &str) -> Result<Tournament>;
    /// The bracket exactly as stored, for the normalizer. `None` before the draw.
    async fn fetch_bracket(&self, id: &str) -> Result<Option<Value>>;
    async fn persist_draw(&self, id: &str, commit: &DrawCommit) -> Result<()>;
    async fn persist_result(&self, id: &str, match_id: &str, result: &MatchResult) -> Result<()>;
    async fn fetch_stats(&self, id: &str) -> Result<Vec<MatchStats>>;
}

/// One JSON document per tournament plus a statistics log next to it.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn tournament_path(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{id}.json")))
    }

    fn stats_path(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{id}.stats.json")))
    }

    async fn read_json(&self, path: &Path) -> Result<Value> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("invalid json in {}", path.display()))
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("could not create {}", self.dir.display()))?;
        let payload = serde_json::to_string_pretty(value).context("serialize failed")?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload)
            .await
            .with_context(|| format!("could not write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("could not replace {}", path.display()))
    }
}

impl TournamentBackend for FileBackend {
    async fn create_tournament(&self, tournament: &Tournament) -> Result<()> {
        let path = self.tournament_path(&tournament.id)?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            bail!("tournament {} already exists", tournament.id);
        }
        info!("creating tournament {}", tournament.id);
        self.write_json(&path, tournament).await
    }

    async fn save_tournament(&self, tournament: &Tournament) -> Result<()> {
        let path = self.tournament_path(&tournament.id)?;
        self.write_json(&path, tournament).await
    }

    async fn fetch_tournament(&self, id: &str) -> Result<Tournament> {
        let path = self.tournament_path(id)?;
        let raw = self.read_json(&path).await?;
        serde_json::from_value(raw).with_context(|| format!("malformed tournament {id}"))
    }

    async fn fetch_bracket(&self, id: &str) -> Result<Option<Value>> {
        let path = self.tournament_path(id)?;
        let mut raw = self.read_json(&path).await?;
        Ok(raw.get_mut("bracket").map(Value::take).filter(|b| !b.is_null()))
    }

    async fn persist_draw(&self, id: &str, commit: &DrawCommit) -> Result<()> {
        let mut tournament = self.fetch_tournament(id).await?;
        tournament
            .apply_draw_commit(commit)
            .map_err(|e| anyhow!("draw rejected for {id}: {e}"))?;
        self.save_tournament(&tournament).await?;
        debug!("stored draw for {id}");
        Ok(())
    }

    async fn persist_result(&self, id: &str, match_id: &str, result: &MatchResult) -> Result<()> {
        let mut tournament = self.fetch_tournament(id).await?;
        let outcome = tournament
            .record_result(match_id, result)
            .map_err(|e| anyhow!("result rejected for {id}/{match_id}: {e}"))?;

        // The bracket is the record; stats only follow a stored result.
        self.save_tournament(&tournament).await?;

        let mut stats = self.fetch_stats(id).await?;
        stats.retain(|s| s.match_id != outcome.stats.match_id);
        stats.push(outcome.stats);
        self.write_json(&self.stats_path(id)?, &stats).await?;
        debug!("stored result for {id}/{match_id}");
        Ok(())
    }

    async fn fetch_stats(&self, id: &str) -> Result<Vec<MatchStats>> {
        let path = self.stats_path(id)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let raw = self.read_json(&path).await?;
        serde_json::from_value(raw).with_context(|| format!("malformed statistics for {id}"))
    }
}

/// Tournament ids become file names, so only plain slugs are allowed.
fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        bail!("invalid tournament id {id:?}: use letters, digits, '-' or '_'");
    }
    Ok(())
}
