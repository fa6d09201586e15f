use crate::results::{MatchResult, ResultOutcome, record_result};
use crate::tournament::Stage;
use crate::{Bracket, BracketResult, Podium, Team};
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Cached brackets older than this read as absent.
pub const BRACKET_TTL_SECS: i64 = 30;

const CACHE_VERSION: u32 = 1;
const KEY_PREFIX: &str = "bracket_";

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(now)) }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Storage backends
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error, PathBuf),
    Serde(serde_json::Error, String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(e, path) => write!(f, "Cache I/O error for {}: {e}", path.display()),
            CacheError::Serde(e, what) => write!(f, "Cache encoding error for {what}: {e}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(e, _) => Some(e),
            CacheError::Serde(e, _) => Some(e),
        }
    }
}

/// Tournament facts stored next to the bracket snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheExtras {
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub draw_completed: bool,
    #[serde(default)]
    pub champion: Option<Team>,
    #[serde(default)]
    pub podium: Option<Podium>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub bracket: Bracket,
    #[serde(default)]
    pub extras: CacheExtras,
    pub stored_at: DateTime<Utc>,
}

pub trait CacheStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;
    fn save(&mut self, key: &str, entry: &CacheEntry) -> Result<(), CacheError>;
    fn remove(&mut self, key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, CacheEntry>,
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        self.entries.insert(key.to_owned(), entry.clone());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

/// All entries in one JSON file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<CacheFile, CacheError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CacheFile::default()),
            Err(e) => return Err(CacheError::Io(e, self.path.clone())),
        };
        let file: CacheFile = serde_json::from_str(&raw)
            .map_err(|e| CacheError::Serde(e, self.path.display().to_string()))?;
        if file.version != CACHE_VERSION {
            debug!("discarding cache file with version {}", file.version);
            return Ok(CacheFile::default());
        }
        Ok(file)
    }

    fn write(&self, file: &CacheFile) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| CacheError::Io(e, dir.to_path_buf()))?;
        }
        let json = serde_json::to_string(file)
            .map_err(|e| CacheError::Serde(e, self.path.display().to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| CacheError::Io(e, tmp.clone()))?;
        fs::rename(&tmp, &self.path).map_err(|e| CacheError::Io(e, self.path.clone()))
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.read()?.entries.remove(key))
    }

    fn save(&mut self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        // A corrupt file is replaced rather than blocking every later write.
        let mut file = self.read().unwrap_or_default();
        file.version = CACHE_VERSION;
        file.entries.insert(key.to_owned(), entry.clone());
        self.write(&file)
    }

    fn remove(&mut self, key: &str) -> Result<(), CacheError> {
        let mut file = self.read().unwrap_or_default();
        if file.entries.remove(key).is_some() {
            file.version = CACHE_VERSION;
            self.write(&file)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bracket cache
// ---------------------------------------------------------------------------

/// Short-lived bracket snapshots keyed by tournament id.
///
/// Reads never fail: missing, stale and unreadable entries all mean "fetch
/// again from the backend of record".
#[derive(Debug)]
pub struct BracketCache<S = MemoryStore, C = SystemClock> {
    store: S,
    clock: C,
    ttl: TimeDelta,
    /// Keys invalidated by this cache; they miss until the next `put`,
    /// whether or not the store managed to remove them.
    invalidated: HashSet<String>,
}

impl Default for BracketCache {
    fn default() -> Self {
        Self::new(MemoryStore::default(), SystemClock)
    }
}

impl<S: CacheStore, C: Clock> BracketCache<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            ttl: TimeDelta::seconds(BRACKET_TTL_SECS),
            invalidated: HashSet::new(),
        }
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    fn key(tournament_id: &str) -> String {
        format!("{KEY_PREFIX}{tournament_id}")
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn get(&mut self, tournament_id: &str) -> Option<Bracket> {
        self.get_entry(tournament_id).map(|entry| entry.bracket)
    }

    pub fn get_entry(&mut self, tournament_id: &str) -> Option<CacheEntry> {
        let key = Self::key(tournament_id);
        if self.invalidated.contains(&key) {
            debug!("cache entry for {tournament_id} was invalidated");
            return None;
        }
        let entry = match self.store.load(&key) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("cache miss for {tournament_id}");
                return None;
            }
            Err(e) => {
                warn!("dropping unreadable cache entry for {tournament_id}: {e}");
                return None;
            }
        };

        let age = self.clock.now().signed_duration_since(entry.stored_at);
        if age > self.ttl {
            debug!("cache entry for {tournament_id} is stale ({}s old)", age.num_seconds());
            if let Err(e) = self.store.remove(&key) {
                warn!("could not evict stale cache entry for {tournament_id}: {e}");
            }
            return None;
        }
        debug!("cache hit for {tournament_id}");
        Some(entry)
    }

    pub fn put(
        &mut self,
        tournament_id: &str,
        bracket: Bracket,
        extras: CacheExtras,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            bracket,
            extras,
            stored_at: self.clock.now(),
        };
        let key = Self::key(tournament_id);
        self.store.save(&key, &entry)?;
        self.invalidated.remove(&key);
        Ok(())
    }

    pub fn invalidate(&mut self, tournament_id: &str) -> Result<(), CacheError> {
        debug!("invalidating cached bracket for {tournament_id}");
        let key = Self::key(tournament_id);
        self.invalidated.insert(key.clone());
        self.store.remove(&key)
    }

    /// Record a result against `bracket` and drop the cached snapshot on success.
    /// The caller fetches the authoritative bracket again afterwards.
    pub fn record_result(
        &mut self,
        tournament_id: &str,
        bracket: &Bracket,
        match_id: &str,
        result: &MatchResult,
    ) -> BracketResult<ResultOutcome> {
        let outcome = record_result(bracket, match_id, result)?;
        if let Err(e) = self.invalidate(tournament_id) {
            warn!("could not invalidate cached bracket for {tournament_id}: {e}");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Match, MatchSlot};
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::at(Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap())
    }

    fn ready_bracket() -> Bracket {
        let mut bracket = Bracket::empty();
        bracket.quarter_finals[0] = Match::between("q1", Team::new("a", "A"), Team::new("b", "B"));
        bracket
    }

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("knockout-cache-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("cache.json")
    }

    #[test]
    fn entries_expire_after_ttl() {
        let clock = clock();
        let mut cache = BracketCache::new(MemoryStore::default(), clock.clone());
        cache.put("cup", ready_bracket(), CacheExtras::default()).unwrap();

        clock.advance(TimeDelta::seconds(BRACKET_TTL_SECS));
        assert_eq!(cache.get("cup"), Some(ready_bracket()));

        clock.advance(TimeDelta::seconds(1));
        assert_eq!(cache.get("cup"), None);
        // Stale entries are evicted, not just hidden.
        clock.advance(TimeDelta::seconds(-60));
        assert_eq!(cache.get("cup"), None);
    }

    #[test]
    fn custom_ttl_is_honoured() {
        let clock = clock();
        let mut cache = BracketCache::new(MemoryStore::default(), clock.clone())
            .with_ttl(TimeDelta::seconds(5));
        cache.put("cup", ready_bracket(), CacheExtras::default()).unwrap();
        clock.advance(TimeDelta::seconds(6));
        assert!(cache.get("cup").is_none());
    }

    #[test]
    fn successful_result_invalidates() {
        let mut cache = BracketCache::new(MemoryStore::default(), clock());
        let bracket = ready_bracket();
        cache.put("cup", bracket.clone(), CacheExtras::default()).unwrap();

        let outcome = cache
            .record_result("cup", &bracket, "q1", &MatchResult::new(1, 0, "a"))
            .unwrap();
        assert_eq!(outcome.slot, MatchSlot::QuarterFinal(0));
        assert!(cache.get("cup").is_none());
    }

    #[test]
    fn failed_result_keeps_entry() {
        let mut cache = BracketCache::new(MemoryStore::default(), clock());
        let bracket = ready_bracket();
        cache.put("cup", bracket.clone(), CacheExtras::default()).unwrap();

        assert!(
            cache
                .record_result("cup", &bracket, "q1", &MatchResult::new(1, 0, "nobody"))
                .is_err()
        );
        assert_eq!(cache.get("cup"), Some(bracket));
    }

    /// Memory store whose removals always fail.
    #[derive(Default)]
    struct StickyStore(MemoryStore);

    impl CacheStore for StickyStore {
        fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
            self.0.load(key)
        }

        fn save(&mut self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
            self.0.save(key, entry)
        }

        fn remove(&mut self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Io(
                std::io::Error::other("read-only"),
                PathBuf::from("sticky"),
            ))
        }
    }

    #[test]
    fn failed_removal_still_hides_the_entry() {
        let mut cache = BracketCache::new(StickyStore::default(), clock());
        let bracket = ready_bracket();
        cache.put("cup", bracket.clone(), CacheExtras::default()).unwrap();

        cache
            .record_result("cup", &bracket, "q1", &MatchResult::new(1, 0, "a"))
            .unwrap();
        assert!(cache.get("cup").is_none());
        assert!(cache.invalidate("cup").is_err());
        assert!(cache.get("cup").is_none());

        cache.put("cup", bracket.clone(), CacheExtras::default()).unwrap();
        assert_eq!(cache.get("cup"), Some(bracket));
    }

    #[test]
    fn file_store_round_trips_and_survives_corruption() {
        let path = temp_path("file");
        let clock = clock();
        let extras = CacheExtras {
            stage: Some(Stage::Knockout),
            draw_completed: true,
            ..CacheExtras::default()
        };
        let mut cache = BracketCache::new(JsonFileStore::new(&path), clock.clone());
        cache.put("cup", ready_bracket(), extras.clone()).unwrap();

        let mut reopened = BracketCache::new(JsonFileStore::new(&path), clock.clone());
        let entry = reopened.get_entry("cup").unwrap();
        assert_eq!(entry.extras, extras);
        assert_eq!(entry.bracket, ready_bracket());

        fs::write(&path, "{ not json").unwrap();
        assert!(reopened.get("cup").is_none());
        reopened.put("cup", ready_bracket(), CacheExtras::default()).unwrap();
        assert!(reopened.get("cup").is_some());

        reopened.invalidate("cup").unwrap();
        assert!(reopened.get("cup").is_none());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
