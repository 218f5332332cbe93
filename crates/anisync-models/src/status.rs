use serde::{Deserialize, Serialize};
use std::fmt;

/// Watch status on MyAnimeList.
///
/// The code is the status value MAL uses in its list editor, which is also the
/// 1-based position of the option in the `#myinfo_status` dropdown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WatchStatus {
    /// Plan to watch (the default when nothing was watched yet)
    ToWatch,
    /// Currently watching
    Watching,
    /// Finished every known episode
    Completed,
}

impl WatchStatus {
    pub fn code(&self) -> &'static str {
        match self {
            WatchStatus::ToWatch => "5",
            WatchStatus::Watching => "1",
            WatchStatus::Completed => "2",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "5" => Some(WatchStatus::ToWatch),
            "1" => Some(WatchStatus::Watching),
            "2" => Some(WatchStatus::Completed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WatchStatus::ToWatch => "To watch",
            WatchStatus::Watching => "Watching",
            WatchStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
