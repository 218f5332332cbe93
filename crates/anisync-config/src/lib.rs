pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{BrowserConfig, Config, ConfigError, CrossReferenceConfig, MyAnimeListConfig, PlexConfig, SchedulerConfig, SyncTime, DEFAULT_SNAPSHOT_URL};
pub use credentials::CredentialStore;
pub use paths::{PathManager, container_base_path};
