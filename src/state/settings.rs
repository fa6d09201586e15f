use log::LevelFilter;
use std::path::PathBuf;

const APP_DIR: &str = "knockout";

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub data_dir: PathBuf,
    pub log_level: LevelFilter,
}

impl AppSettings {
    /// Command-line values win over the environment, which wins over defaults.
    pub fn load(data_dir: Option<PathBuf>, log_level: Option<LevelFilter>) -> Self {
        let log_level = log_level
            .or_else(|| {
                std::env::var("KNOCKOUT_LOG")
                    .ok()
                    .and_then(|level| level.trim().parse::<LevelFilter>().ok())
            })
            .unwrap_or(LevelFilter::Info);
        Self {
            data_dir: data_dir.unwrap_or_else(default_data_dir),
            log_level,
        }
    }

    pub fn tournaments_dir(&self) -> PathBuf {
        self.data_dir.join("tournaments")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.data_dir.join("bracket_cache.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("knockout.log")
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("KNOCKOUT_DATA_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME")
        && !data_home.trim().is_empty()
    {
        return PathBuf::from(data_home).join(APP_DIR);
    }
    if let Ok(home) = std::env::var("HOME")
        && !home.trim().is_empty()
    {
        return PathBuf::from(home).join(".local").join("share").join(APP_DIR);
    }
    PathBuf::from("knockout-data")
}
