use serde::{Deserialize, Serialize};

/// A show as seen by the media library.
///
/// `library_id` is the TVDB series id extracted from the show's GUIDs. Specials
/// (season 0) are never stored in `seasons`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryShow {
    pub library_id: String,
    pub title: String,
    pub seasons: Vec<LibrarySeason>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibrarySeason {
    pub number: u32,
    pub episodes: Vec<LibraryEpisode>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryEpisode {
    pub number: u32,
    pub watched: bool,
}

impl LibraryShow {
    /// Build a show, dropping specials and ordering seasons by number
    pub fn new(library_id: impl Into<String>, title: impl Into<String>, seasons: Vec<LibrarySeason>) -> Self {
        let mut seasons: Vec<LibrarySeason> = seasons.into_iter().filter(|s| s.number > 0).collect();
        seasons.sort_by_key(|s| s.number);
        Self {
            library_id: library_id.into(),
            title: title.into(),
            seasons,
        }
    }

    /// Season numbers in ascending order (never includes 0)
    pub fn season_numbers(&self) -> Vec<u32> {
        self.seasons.iter().map(|s| s.number).collect()
    }

    pub fn season(&self, number: u32) -> Option<&LibrarySeason> {
        self.seasons.iter().find(|s| s.number == number)
    }
}

impl LibrarySeason {
    pub fn new(number: u32, episodes: Vec<LibraryEpisode>) -> Self {
        Self { number, episodes }
    }

    /// Number of episodes the library has marked as watched
    pub fn watched_count(&self) -> u32 {
        self.episodes.iter().filter(|e| e.watched).count() as u32
    }
}
