use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};

use anisync_config::{Config, PathManager};
use anisync_models::{UpdateCandidate, WatchStatus};
use anisync_sources::{
    AnidbLookup, LibrarySource, SessionFactory, SnapshotSource, SourceError, TrackerSession,
    TrackingListFetcher,
};

use crate::mapping::MappingState;
use crate::recent::{update_line, RecentUpdates};
use crate::reconcile::{compute_candidates, status_for};
use crate::resolver::Resolver;
use crate::service::SyncState;
use crate::store::StoreError;
use crate::xref::{CrossReferenceImporter, XrefError};

pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to start browser session: {0}")]
    Session(#[source] SourceError),

    #[error("failed to load library shows: {0}")]
    Library(#[source] SourceError),

    #[error("failed to load MyAnimeList list: {0}")]
    TrackingList(#[source] SourceError),

    #[error(transparent)]
    CrossReference(#[from] XrefError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid season {0}, seasons start at 1")]
    InvalidSeason(u32),

    #[error("invalid manual mapping: {0}")]
    InvalidMapping(String),
}

/// External services a pass talks to
#[derive(Clone)]
pub struct SyncCollaborators {
    pub sessions: Arc<dyn SessionFactory>,
    pub library: Arc<dyn LibrarySource>,
    pub tracking_list: Arc<dyn TrackingListFetcher>,
    pub snapshot: Arc<dyn SnapshotSource>,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub library: String,
    pub username: String,
    pub snapshot_url: String,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            library: config.plex.library.clone(),
            username: config.myanimelist.username.clone(),
            snapshot_url: config.cross_reference.snapshot_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub shows: usize,
    pub resolved_seasons: usize,
    pub unresolved_seasons: usize,
    pub candidates: usize,
    pub applied: usize,
    pub failed: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pass ran to the end (possibly with nothing to update)
    Completed(SyncReport),
    /// Every login attempt failed, so no candidate was applied
    LoginFailed(SyncReport),
}

impl SyncOutcome {
    pub fn report(&self) -> &SyncReport {
        match self {
            SyncOutcome::Completed(report) | SyncOutcome::LoginFailed(report) => report,
        }
    }
}

/// Runs one sync pass from library load to MAL updates
pub struct SyncOrchestrator {
    collaborators: SyncCollaborators,
    settings: SyncSettings,
    paths: PathManager,
    state: Arc<SyncState>,
}

impl SyncOrchestrator {
    pub fn new(
        collaborators: SyncCollaborators,
        settings: SyncSettings,
        paths: PathManager,
        state: Arc<SyncState>,
    ) -> Self {
        Self {
            collaborators,
            settings,
            paths,
            state,
        }
    }

    pub fn paths(&self) -> &PathManager {
        &self.paths
    }

    /// Run a full pass. The browser session is closed however the pass ends.
    pub async fn run_pass(&self) -> Result<SyncOutcome, SyncError> {
        let start = Instant::now();
        info!(
            operation = "sync_start",
            library = %self.settings.library,
            user = %self.settings.username,
            "Starting sync"
        );
        self.state.set_activity("Starting sync");

        let mut session = self
            .collaborators
            .sessions
            .open()
            .await
            .map_err(SyncError::Session)?;

        let result = self.run_with_session(session.as_mut()).await;

        if let Err(e) = session.quit().await {
            warn!("Failed to close browser session: {}", e);
        }

        result.map(|mut outcome| {
            let duration = start.elapsed();
            match &mut outcome {
                SyncOutcome::Completed(report) | SyncOutcome::LoginFailed(report) => {
                    report.duration = duration;
                }
            }
            info!(
                operation = "sync_complete",
                duration_ms = duration.as_millis() as u64,
                applied = outcome.report().applied,
                failed = outcome.report().failed,
                "Sync complete"
            );
            outcome
        })
    }

    async fn run_with_session(&self, session: &mut dyn TrackerSession) -> Result<SyncOutcome, SyncError> {
        let mut report = SyncReport::default();

        let shows = self
            .collaborators
            .library
            .get_shows(&self.settings.library)
            .await
            .map_err(SyncError::Library)?;
        report.shows = shows.len();

        self.state.set_activity("Refreshing cross-reference snapshot");
        let importer = CrossReferenceImporter::from_paths(&self.settings.snapshot_url, &self.paths);
        let xref = importer
            .refresh_if_stale(self.collaborators.snapshot.as_ref(), SystemTime::now())
            .await?;

        self.state.set_activity("Resolving MyAnimeList ids");
        let mut mapping_state = MappingState::load(&self.paths)?;
        let summary = {
            let mut lookup = AnidbLookup::new(&mut *session);
            Resolver::new(&mut mapping_state, &xref)
                .resolve_all(&mut lookup, &shows)
                .await?
        };
        report.resolved_seasons = summary.resolved;
        report.unresolved_seasons = summary.unresolved;
        info!(
            operation = "resolve_complete",
            resolved = summary.resolved,
            unresolved = summary.unresolved,
            "Resolved MAL ids"
        );

        let list = self
            .collaborators
            .tracking_list
            .fetch_list(&self.settings.username)
            .await
            .map_err(SyncError::TrackingList)?;
        let candidates = compute_candidates(&shows, mapping_state.mappings(), &list);
        report.candidates = candidates.len();
        info!("{} updates required", candidates.len());

        if candidates.is_empty() {
            self.state.set_activity("Nothing to update");
            return Ok(SyncOutcome::Completed(report));
        }

        self.state.set_activity("Logging into MyAnimeList");
        if !login(session).await {
            tracing::error!(operation = "login", status = "error", "Failed to log into MyAnimeList");
            self.state.set_activity("Failed to log into MyAnimeList");
            return Ok(SyncOutcome::LoginFailed(report));
        }

        let recent_path = self.paths.recent_updates_file();
        let mut recent = RecentUpdates::load(&recent_path)?;
        for candidate in &candidates {
            self.state.set_activity(format!(
                "Updating {} season {}",
                candidate.title, candidate.season
            ));
            match apply_candidate(session, candidate).await {
                Ok(Some(status)) => {
                    let line = update_line(candidate, status);
                    info!(operation = "update", tracking_id = %candidate.tracking_id, "{}", line);
                    recent.push(line);
                    recent.save(&recent_path)?;
                    report.applied += 1;
                }
                Ok(None) => {
                    warn!("Can't load MAL page for id {}", candidate.tracking_id);
                    mapping_state.record_unresolved(&candidate.library_id, &candidate.title, candidate.season)?;
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to update {} season {}: {}",
                        candidate.title, candidate.season, e
                    );
                    mapping_state.record_unresolved(&candidate.library_id, &candidate.title, candidate.season)?;
                    report.failed += 1;
                }
            }
        }

        self.state.set_activity(format!(
            "Sync complete: {} updated, {} failed",
            report.applied, report.failed
        ));
        Ok(SyncOutcome::Completed(report))
    }
}

/// Bounded login loop; an attempt that errors counts as a failed attempt
async fn login(session: &mut dyn TrackerSession) -> bool {
    for attempt in 1..=MAX_LOGIN_ATTEMPTS {
        info!("Logging into MyAnimeList attempt: {}", attempt);
        match session.attempt_login().await {
            Ok(true) => return true,
            Ok(false) => debug!("Login attempt {} did not reach the profile page", attempt),
            Err(e) => warn!("Login attempt {} failed: {}", attempt, e),
        }
    }
    false
}

/// Returns `None` when MAL has no page for the candidate's id
async fn apply_candidate(
    session: &mut dyn TrackerSession,
    candidate: &UpdateCandidate,
) -> Result<Option<WatchStatus>, SourceError> {
    debug!("Updating series {} season {}", candidate.title, candidate.season);
    let Some(page) = session.open_anime_page(&candidate.tracking_id).await? else {
        return Ok(None);
    };

    let status = status_for(candidate.watched_episodes, page.total_episodes);
    let episodes = match page.total_episodes {
        Some(total) if total > 0 => candidate.watched_episodes.min(total),
        _ => candidate.watched_episodes,
    };
    session.set_status_and_episodes(status, episodes).await?;
    Ok(Some(status))
}
