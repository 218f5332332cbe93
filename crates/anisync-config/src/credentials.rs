use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

const PLEX_TOKEN: &str = "plex_token";
const MAL_PASSWORD: &str = "mal_password";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Secrets kept out of `config.toml` so the config can be shared safely
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read {}", self.path.display()))?;
            let creds_data: CredentialsData = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", self.path.display()))?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_plex_token(&self) -> Option<&String> {
        self.get(PLEX_TOKEN)
    }

    pub fn set_plex_token(&mut self, token: String) {
        self.set(PLEX_TOKEN.to_string(), token);
    }

    pub fn get_mal_password(&self) -> Option<&String> {
        self.get(MAL_PASSWORD)
    }

    pub fn set_mal_password(&mut self, password: String) {
        self.set(MAL_PASSWORD.to_string(), password);
    }

    /// Names of the credentials a sync pass needs but the store lacks
    pub fn missing(&self) -> Vec<&'static str> {
        [PLEX_TOKEN, MAL_PASSWORD]
            .into_iter()
            .filter(|key| self.get(key).is_none())
            .collect()
    }
}
