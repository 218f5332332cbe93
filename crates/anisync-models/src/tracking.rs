use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the user's MyAnimeList anime list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TrackedEntry {
    #[serde(default)]
    pub num_watched_episodes: u32,
    /// Total episodes of the anime; MAL reports 0 while a show is still airing
    #[serde(default)]
    pub anime_num_episodes: Option<u32>,
}

/// Snapshot of the user's list, keyed by MAL anime id
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackingList {
    entries: HashMap<String, TrackedEntry>,
}

impl TrackingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tracking_id: impl Into<String>, entry: TrackedEntry) {
        self.entries.insert(tracking_id.into(), entry);
    }

    pub fn get(&self, tracking_id: &str) -> Option<&TrackedEntry> {
        self.entries.get(tracking_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, TrackedEntry)> for TrackingList {
    fn from_iter<I: IntoIterator<Item = (String, TrackedEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
