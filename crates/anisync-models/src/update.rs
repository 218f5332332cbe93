use serde::{Deserialize, Serialize};

/// A season whose MAL entry is behind the library and should be rewritten.
///
/// Produced per sync pass and never persisted. Both watched counts are kept so
/// the activity log can show the episode change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateCandidate {
    pub title: String,
    pub season: u32,
    pub library_id: String,
    pub tracking_id: String,
    /// Episodes marked watched in the library
    pub watched_episodes: u32,
    /// Episodes marked watched on MAL (0 when the anime is not on the list)
    pub tracking_watched_episodes: u32,
}
