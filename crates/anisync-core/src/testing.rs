//! Fakes and builders shared by the core tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anisync_models::{LibraryEpisode, LibrarySeason, LibraryShow, TrackedEntry, TrackingList, WatchStatus};
use anisync_sources::{
    AnimePage, LibrarySource, PageLookup, SessionFactory, SnapshotSource, SourceError, TrackerSession,
    TrackingListFetcher,
};

/// Build a show from `(season, watched, episodes)` triples
pub fn show(library_id: &str, title: &str, seasons: &[(u32, u32, u32)]) -> LibraryShow {
    let seasons = seasons
        .iter()
        .map(|&(number, watched, episodes)| {
            let episodes = (1..=episodes)
                .map(|n| LibraryEpisode { number: n, watched: n <= watched })
                .collect();
            LibrarySeason::new(number, episodes)
        })
        .collect();
    LibraryShow::new(library_id, title, seasons)
}

/// Build a MAL list from `(tracking_id, watched, total)` triples
pub fn tracked(entries: &[(&str, u32, Option<u32>)]) -> TrackingList {
    entries
        .iter()
        .map(|&(id, watched, total)| {
            (
                id.to_string(),
                TrackedEntry {
                    num_watched_episodes: watched,
                    anime_num_episodes: total,
                },
            )
        })
        .collect()
}

pub struct FakeSnapshot {
    body: Mutex<Option<String>>,
    fetches: AtomicUsize,
}

impl FakeSnapshot {
    pub fn new(body: &str) -> Self {
        Self {
            body: Mutex::new(Some(body.to_string())),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            body: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_body(&self, body: &str) {
        *self.body.lock().unwrap() = Some(body.to_string());
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for FakeSnapshot {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.body.lock().unwrap().clone() {
            Some(body) => Ok(body.into_bytes()),
            None => Err(SourceError::Response {
                url: url.to_string(),
                message: "status 503 Service Unavailable".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeLookup {
    links: HashMap<String, String>,
    pub failing: Vec<String>,
    pub requested: Vec<String>,
}

impl FakeLookup {
    pub fn with(links: &[(&str, &str)]) -> Self {
        Self {
            links: links.iter().map(|(a, m)| (a.to_string(), m.to_string())).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PageLookup for FakeLookup {
    async fn lookup_tracking_id(&mut self, xref_id: &str) -> Result<Option<String>, SourceError> {
        self.requested.push(xref_id.to_string());
        if self.failing.iter().any(|id| id == xref_id) {
            return Err(SourceError::browser("page load timed out"));
        }
        Ok(self.links.get(xref_id).cloned())
    }
}

/// How a fake browser session behaves
#[derive(Debug, Clone, Default)]
pub struct SessionScript {
    /// Attempt number (1-based) on which login succeeds; never when `None`
    pub login_succeeds_on: Option<u32>,
    /// Attempt numbers that fail with an automation error
    pub login_errors: Vec<u32>,
    /// MAL pages that exist, with their total episode count
    pub pages: HashMap<String, Option<u32>>,
    /// MAL pages whose automation fails
    pub broken_pages: Vec<String>,
    /// AniDB id to the MAL id linked from its page
    pub anidb_links: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct SessionLog {
    pub sessions_opened: u32,
    pub login_attempts: u32,
    pub applied: Vec<(String, WatchStatus, u32)>,
    pub quit_calls: u32,
}

pub struct FakeSession {
    script: SessionScript,
    log: Arc<Mutex<SessionLog>>,
    current: Option<String>,
}

#[async_trait]
impl TrackerSession for FakeSession {
    async fn attempt_login(&mut self) -> Result<bool, SourceError> {
        let attempt = {
            let mut log = self.log.lock().unwrap();
            log.login_attempts += 1;
            log.login_attempts
        };
        if self.script.login_errors.contains(&attempt) {
            return Err(SourceError::browser("login form did not load"));
        }
        Ok(self.script.login_succeeds_on.is_some_and(|n| attempt >= n))
    }

    async fn open_anime_page(&mut self, tracking_id: &str) -> Result<Option<AnimePage>, SourceError> {
        if self.script.broken_pages.iter().any(|id| id == tracking_id) {
            return Err(SourceError::browser("element #curEps not found"));
        }
        self.current = Some(tracking_id.to_string());
        Ok(self
            .script
            .pages
            .get(tracking_id)
            .map(|total| AnimePage { total_episodes: *total }))
    }

    async fn set_status_and_episodes(&mut self, status: WatchStatus, episodes: u32) -> Result<(), SourceError> {
        let id = self.current.clone().unwrap_or_default();
        self.log.lock().unwrap().applied.push((id, status, episodes));
        Ok(())
    }

    async fn page_html(&mut self, url: &str) -> Result<String, SourceError> {
        let anidb_id = url.rsplit('/').next().unwrap_or_default();
        Ok(match self.script.anidb_links.get(anidb_id) {
            Some(mal_id) => format!(
                r#"<a class="i_icon i_resource_mal brand" href="https://myanimelist.net/anime/{}"></a>"#,
                mal_id
            ),
            None => "<html><body></body></html>".to_string(),
        })
    }

    async fn quit(&mut self) -> Result<(), SourceError> {
        self.log.lock().unwrap().quit_calls += 1;
        Ok(())
    }
}

pub struct FakeSessionFactory {
    pub script: SessionScript,
    pub log: Arc<Mutex<SessionLog>>,
}

impl FakeSessionFactory {
    pub fn new(script: SessionScript) -> Self {
        Self {
            script,
            log: Arc::new(Mutex::new(SessionLog::default())),
        }
    }
}

#[async_trait]
impl SessionFactory for FakeSessionFactory {
    async fn open(&self) -> Result<Box<dyn TrackerSession>, SourceError> {
        self.log.lock().unwrap().sessions_opened += 1;
        Ok(Box::new(FakeSession {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
            current: None,
        }))
    }
}

pub struct FakeLibrary {
    pub shows: Option<Vec<LibraryShow>>,
}

#[async_trait]
impl LibrarySource for FakeLibrary {
    async fn get_shows(&self, library: &str) -> Result<Vec<LibraryShow>, SourceError> {
        self.shows
            .clone()
            .ok_or_else(|| SourceError::LibraryNotFound(library.to_string()))
    }
}

pub struct FakeList {
    pub list: TrackingList,
    pub fetched_for: Mutex<Vec<String>>,
}

impl FakeList {
    pub fn new(list: TrackingList) -> Self {
        Self {
            list,
            fetched_for: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TrackingListFetcher for FakeList {
    async fn fetch_list(&self, username: &str) -> Result<TrackingList, SourceError> {
        self.fetched_for.lock().unwrap().push(username.to_string());
        Ok(self.list.clone())
    }
}
