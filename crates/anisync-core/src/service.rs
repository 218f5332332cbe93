use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use anisync_config::PathManager;

use crate::ledger::ErrorLedger;
use crate::mapping::MappingState;
use crate::recent::RecentUpdates;
use crate::store::{self, StoreError};
use crate::sync::{SyncError, SyncOrchestrator, SyncOutcome};

/// Process-wide run flag plus the latest progress line
#[derive(Debug, Default)]
pub struct SyncState {
    running: AtomicBool,
    latest_activity: Mutex<Option<String>>,
    /// Held by a pass for its whole run and by manual mapping writes
    stores: tokio::sync::Mutex<()>,
}

/// Clears the running flag when dropped, including on unwind
#[derive(Debug)]
pub struct RunGuard {
    state: Arc<SyncState>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the run flag, or `None` if a pass is already running
    pub fn try_begin(self: &Arc<Self>) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard {
                state: Arc::clone(self),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_activity(&self, activity: impl Into<String>) {
        if let Ok(mut latest) = self.latest_activity.lock() {
            *latest = Some(activity.into());
        }
    }

    pub fn latest_activity(&self) -> Option<String> {
        self.latest_activity.lock().ok().and_then(|latest| latest.clone())
    }
}

/// Everything a front end (CLI, scheduler) needs to drive and inspect syncs
pub struct SyncService {
    orchestrator: SyncOrchestrator,
    state: Arc<SyncState>,
    paths: PathManager,
}

impl SyncService {
    pub fn new(orchestrator: SyncOrchestrator, state: Arc<SyncState>) -> Self {
        let paths = orchestrator.paths().clone();
        Self {
            orchestrator,
            state,
            paths,
        }
    }

    /// Run a pass unless one is already in flight, in which case `Ok(None)`
    pub async fn trigger_sync(&self) -> Result<Option<SyncOutcome>, SyncError> {
        let Some(_guard) = self.state.try_begin() else {
            info!("A sync is already running, ignoring request");
            return Ok(None);
        };
        let _stores = self.state.stores.lock().await;

        match self.orchestrator.run_pass().await {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                error!(operation = "sync", status = "error", error = %e, "Sync failed");
                self.state.set_activity(format!("Sync failed: {}", e));
                Err(e)
            }
        }
    }

    pub fn recent_updates(&self) -> Result<RecentUpdates, StoreError> {
        RecentUpdates::load(&self.paths.recent_updates_file())
    }

    pub fn error_ledger(&self) -> Result<ErrorLedger, StoreError> {
        store::load_or_default(&self.paths.error_ledger_file())
    }

    pub fn latest_activity(&self) -> Option<String> {
        self.state.latest_activity()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Store a user-supplied mapping and heal the ledger.
    ///
    /// Input is checked with [`ManualMapping::parse`]; a blank tracking id is
    /// ignored (`Ok(false)`). Waits for a running pass to finish so the pass
    /// cannot overwrite the change.
    pub async fn submit_manual_mapping(
        &self,
        library_id: &str,
        season: u32,
        tracking_id: &str,
    ) -> Result<bool, SyncError> {
        let Some(mapping) = ManualMapping::parse(library_id, season, tracking_id)? else {
            warn!("Ignoring blank MAL id for {} season {}", library_id, season);
            return Ok(false);
        };

        let _stores = self.state.stores.lock().await;
        let mut state = MappingState::load(&self.paths)?;
        mapping.apply(&mut state)?;
        self.state.set_activity(format!(
            "Mapped {} season {} to MAL id {}",
            mapping.library_id, mapping.season, mapping.tracking_id
        ));
        Ok(true)
    }
}

/// A manual correction from the user, trimmed and checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualMapping {
    pub library_id: String,
    pub season: u32,
    pub tracking_id: String,
}

impl ManualMapping {
    /// `Ok(None)` when the tracking id is blank, which callers treat as a no-op
    pub fn parse(library_id: &str, season: u32, tracking_id: &str) -> Result<Option<Self>, SyncError> {
        let library_id = library_id.trim();
        let tracking_id = tracking_id.trim();
        if library_id.is_empty() {
            return Err(SyncError::InvalidMapping("TVDB id must not be empty".to_string()));
        }
        if tracking_id.is_empty() {
            return Ok(None);
        }
        if season == 0 {
            return Err(SyncError::InvalidSeason(season));
        }
        if !tracking_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(SyncError::InvalidMapping(format!(
                "MyAnimeList id '{}' is not numeric",
                tracking_id
            )));
        }
        Ok(Some(Self {
            library_id: library_id.to_string(),
            season,
            tracking_id: tracking_id.to_string(),
        }))
    }

    /// Write the mapping and reconcile the ledger
    pub fn apply(&self, state: &mut MappingState) -> Result<(), StoreError> {
        state.add_mapping(&self.library_id, self.season, &self.tracking_id)
    }
}
