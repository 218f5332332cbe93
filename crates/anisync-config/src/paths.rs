use anyhow::Result;
use std::path::{Path, PathBuf};

/// Get the container base path from environment variable, defaulting to "/app"
pub fn container_base_path() -> PathBuf {
    std::env::var("ANISYNC_BASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/app"))
}

#[derive(Debug, Clone)]
pub struct PathManager {
    config_dir: PathBuf,
    data_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("anisync");
        Ok(Self::with_base(base_dir))
    }

    pub fn from_docker_env() -> Self {
        Self::with_base(container_base_path())
    }

    /// Lay out config at `base`, with data and logs in subdirectories
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            data_dir: base.join("data"),
            log_dir: base.join("logs"),
            config_dir: base,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    pub fn daemon_log_file(&self) -> PathBuf {
        self.log_dir.join("anisync.log")
    }

    /// Raw cross-reference snapshot as downloaded
    pub fn snapshot_file(&self) -> PathBuf {
        self.data_dir.join("anime-list-full.xml")
    }

    pub fn cross_reference_file(&self) -> PathBuf {
        self.data_dir.join("tvdb_to_anidb.json")
    }

    pub fn mapping_file(&self) -> PathBuf {
        self.data_dir.join("tvdb_to_mal.json")
    }

    pub fn error_ledger_file(&self) -> PathBuf {
        self.data_dir.join("mapping_errors.json")
    }

    pub fn recent_updates_file(&self) -> PathBuf {
        self.data_dir.join("recent_updates.json")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        // The container image creates the base directory, so its presence means Docker
        let base = container_base_path();
        if base.exists() {
            return Self::from_docker_env();
        }

        Self::new().unwrap_or_else(|_| Self::from_docker_env())
    }
}
