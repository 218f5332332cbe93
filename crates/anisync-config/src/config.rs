use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SNAPSHOT_URL: &str =
    "https://raw.githubusercontent.com/ScudLee/anime-lists/master/anime-list-full.xml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("please fill in the following config values: {}", .0.join(", "))]
    Incomplete(Vec<String>),
    #[error("invalid sync time '{0}', expected HH:MM")]
    InvalidSyncTime(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub plex: PlexConfig,
    pub myanimelist: MyAnimeListConfig,
    #[serde(default)]
    pub cross_reference: CrossReferenceConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlexConfig {
    pub server_url: String,
    /// Name of the Plex library section holding the anime shows
    #[serde(default = "default_library")]
    pub library: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyAnimeListConfig {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossReferenceConfig {
    #[serde(default = "default_snapshot_url")]
    pub snapshot_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Local time of the daily sync
    #[serde(default = "default_sync_time")]
    pub sync_time: SyncTime,
    #[serde(default)]
    pub run_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Explicit Chromium executable; auto-detected when unset
    #[serde(default)]
    pub executable: Option<PathBuf>,
}

/// Wall-clock time of day in `HH:MM` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SyncTime {
    pub hour: u32,
    pub minute: u32,
}

impl SyncTime {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidSyncTime(value.to_string());
        let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for SyncTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for SyncTime {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SyncTime> for String {
    fn from(value: SyncTime) -> Self {
        value.to_string()
    }
}

fn default_library() -> String {
    "Anime".to_string()
}

fn default_snapshot_url() -> String {
    DEFAULT_SNAPSHOT_URL.to_string()
}

fn default_sync_time() -> SyncTime {
    SyncTime { hour: 19, minute: 0 }
}

fn default_true() -> bool {
    true
}

impl Default for CrossReferenceConfig {
    fn default() -> Self {
        Self {
            snapshot_url: default_snapshot_url(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_time: default_sync_time(),
            run_on_startup: false,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
        }
    }
}

impl Config {
    /// Template written by `config init` before the user fills it in
    pub fn template() -> Self {
        Self {
            plex: PlexConfig {
                server_url: String::new(),
                library: default_library(),
            },
            myanimelist: MyAnimeListConfig {
                username: String::new(),
            },
            cross_reference: CrossReferenceConfig::default(),
            scheduler: SchedulerConfig::default(),
            browser: BrowserConfig::default(),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    /// Check that every required value has been filled in.
    ///
    /// All missing values are reported together so the user can fix the file
    /// in one go.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut unfilled = Vec::new();
        let required = [
            ("plex.server_url", &self.plex.server_url),
            ("plex.library", &self.plex.library),
            ("myanimelist.username", &self.myanimelist.username),
            ("cross_reference.snapshot_url", &self.cross_reference.snapshot_url),
        ];
        for (name, value) in required {
            if is_unfilled(value) {
                unfilled.push(name.to_string());
            }
        }

        if unfilled.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Incomplete(unfilled))
        }
    }
}

fn is_unfilled(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("null")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn filled_config() -> Config {
        let mut config = Config::template();
        config.plex.server_url = "http://localhost:32400".to_string();
        config.myanimelist.username = "SkippyTheSnake".to_string();
        config
    }

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = filled_config();
        config.scheduler.sync_time = SyncTime::parse("07:30").unwrap();

        config.save_to_file(file.path()).unwrap();
        let loaded = Config::load_from_file(file.path()).unwrap();

        assert_eq!(loaded.plex.server_url, "http://localhost:32400");
        assert_eq!(loaded.plex.library, "Anime");
        assert_eq!(loaded.myanimelist.username, "SkippyTheSnake");
        assert_eq!(loaded.scheduler.sync_time, SyncTime { hour: 7, minute: 30 });
        assert_eq!(loaded.cross_reference.snapshot_url, DEFAULT_SNAPSHOT_URL);
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let content = r#"
            [plex]
            server_url = "http://plex:32400"

            [myanimelist]
            username = "someone"
        "#;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.plex.library, "Anime");
        assert_eq!(config.scheduler.sync_time.to_string(), "19:00");
        assert!(config.browser.headless);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_lists_all_unfilled_values() {
        let mut config = Config::template();
        config.myanimelist.username = "null".to_string();

        match config.validate() {
            Err(ConfigError::Incomplete(values)) => {
                assert_eq!(values, vec!["plex.server_url", "myanimelist.username"]);
            }
            other => panic!("expected incomplete config, got {:?}", other),
        }
        assert!(filled_config().validate().is_ok());
    }

    #[test]
    fn test_sync_time_parse() {
        assert_eq!(SyncTime::parse("19:00").unwrap(), SyncTime { hour: 19, minute: 0 });
        assert_eq!(SyncTime::parse(" 6:05 ").unwrap().to_string(), "06:05");
        assert!(SyncTime::parse("24:00").is_err());
        assert!(SyncTime::parse("12:60").is_err());
        assert!(SyncTime::parse("noon").is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[plex\nserver_url = ").unwrap();
        assert!(matches!(
            Config::load_from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
