pub mod config;
pub mod daemon;
pub mod errors;
pub mod map;
pub mod prompts;
pub mod recent;
pub mod sync;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::sync::Arc;

use anisync_config::{Config, CredentialStore, PathManager};
use anisync_core::{SyncCollaborators, SyncOrchestrator, SyncService, SyncSettings, SyncState};
use anisync_sources::{HttpSnapshotSource, MalListClient, MalSessionFactory, PlexLibrary};

/// Load and validate `config.toml`, pointing at `config init` when it is missing
pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        return Err(eyre!(
            "Configuration file not found at {}. Run 'anisync config init' first.",
            config_file.display()
        ));
    }

    let config = Config::load_from_file(&config_file)?;
    config.validate()?;
    Ok(config)
}

pub fn load_credentials(paths: &PathManager) -> Result<CredentialStore> {
    let credentials_file = paths.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store.load().map_err(|e| {
        eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e)
    })?;
    Ok(cred_store)
}

/// Wire the real Plex, MAL and snapshot clients into a service
pub fn build_service(config: &Config, paths: &PathManager) -> Result<SyncService> {
    let cred_store = load_credentials(paths)?;

    let missing = cred_store.missing();
    if !missing.is_empty() {
        return Err(eyre!(
            "Missing credentials: {}. Run 'anisync config init' to set them.",
            missing.join(", ")
        ));
    }
    let plex_token = cred_store
        .get_plex_token()
        .ok_or_else(|| eyre!("Missing credentials: plex_token"))?;

    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create data directories: {}", e))?;

    let collaborators = SyncCollaborators {
        sessions: Arc::new(MalSessionFactory::new(config, &cred_store, paths)?),
        library: Arc::new(PlexLibrary::new(plex_token, &config.plex.server_url)?),
        tracking_list: Arc::new(MalListClient::new()?),
        snapshot: Arc::new(HttpSnapshotSource::new()?),
    };

    let state = Arc::new(SyncState::new());
    let orchestrator = SyncOrchestrator::new(
        collaborators,
        SyncSettings::from_config(config),
        paths.clone(),
        Arc::clone(&state),
    );
    Ok(SyncService::new(orchestrator, state))
}
