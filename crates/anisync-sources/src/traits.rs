use async_trait::async_trait;
use anisync_models::{LibraryShow, TrackingList, WatchStatus};
use crate::error::SourceError;

/// What the orchestrator needs to know about an opened anime page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimePage {
    /// `None` while the anime is airing and MAL shows `?`
    pub total_episodes: Option<u32>,
}

/// A logged-in (or loggable) browser session against the tracking site.
///
/// One session lives for one sync pass and must be closed with [`quit`].
///
/// [`quit`]: TrackerSession::quit
#[async_trait]
pub trait TrackerSession: Send {
    /// Submit the login form once and report whether the profile marker appeared
    async fn attempt_login(&mut self) -> Result<bool, SourceError>;

    /// Navigate to an anime page, opening the list editor.
    ///
    /// Returns `None` when the site reports that no anime has that id.
    async fn open_anime_page(&mut self, tracking_id: &str) -> Result<Option<AnimePage>, SourceError>;

    /// Fill the list editor of the currently open page and submit it
    async fn set_status_and_episodes(
        &mut self,
        status: WatchStatus,
        episodes: u32,
    ) -> Result<(), SourceError>;

    /// Load an arbitrary URL and return its rendered HTML
    async fn page_html(&mut self, url: &str) -> Result<String, SourceError>;

    async fn quit(&mut self) -> Result<(), SourceError>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn TrackerSession>, SourceError>;
}

/// Resolves a cross-reference id to a tracking id by reading a web page
#[async_trait]
pub trait PageLookup: Send {
    async fn lookup_tracking_id(&mut self, xref_id: &str) -> Result<Option<String>, SourceError>;
}

#[async_trait]
pub trait LibrarySource: Send + Sync {
    async fn get_shows(&self, library: &str) -> Result<Vec<LibraryShow>, SourceError>;
}

#[async_trait]
pub trait TrackingListFetcher: Send + Sync {
    async fn fetch_list(&self, username: &str) -> Result<TrackingList, SourceError>;
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}
