use serde::{Deserialize, Serialize};
use std::path::Path;

use anisync_models::{UpdateCandidate, WatchStatus};

use crate::store::{self, StoreError};

pub const MAX_RECENT_UPDATES: usize = 10;

/// The last few updates applied to MAL, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RecentUpdates {
    lines: Vec<String>,
}

impl RecentUpdates {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let mut updates: Self = store::load_or_default(path)?;
        updates.trim();
        Ok(updates)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        store::save(path, self)
    }

    pub fn push(&mut self, line: String) {
        self.lines.push(line);
        self.trim();
    }

    fn trim(&mut self) {
        if self.lines.len() > MAX_RECENT_UPDATES {
            let excess = self.lines.len() - MAX_RECENT_UPDATES;
            self.lines.drain(..excess);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// e.g. `Cowboy Bebop - Season 1 (Ep 3 → 5) (Watching)`
pub fn update_line(candidate: &UpdateCandidate, status: WatchStatus) -> String {
    let change = if candidate.tracking_watched_episodes != candidate.watched_episodes {
        format!(
            " (Ep {} → {}) ",
            candidate.tracking_watched_episodes, candidate.watched_episodes
        )
    } else {
        " ".to_string()
    };
    format!(
        "{} - Season {}{}({})",
        candidate.title,
        candidate.season,
        change,
        status.label()
    )
}
