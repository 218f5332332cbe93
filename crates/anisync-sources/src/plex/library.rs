use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use anisync_models::{LibraryEpisode, LibrarySeason, LibraryShow};

use crate::error::SourceError;
use crate::plex::api::{EpisodeMetadata, PlexHttpClient};
use crate::traits::LibrarySource;

/// Plex library sections viewed as a list of shows keyed by TVDB id
pub struct PlexLibrary {
    client: PlexHttpClient,
}

impl PlexLibrary {
    pub fn new(token: &str, server_url: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: PlexHttpClient::new(token, server_url)?,
        })
    }
}

#[async_trait]
impl LibrarySource for PlexLibrary {
    async fn get_shows(&self, library: &str) -> Result<Vec<LibraryShow>, SourceError> {
        info!("Getting shows for library {}", library);
        let libraries = self.client.get_libraries().await?;
        let section = libraries
            .iter()
            .find(|l| l.title == library)
            .ok_or_else(|| SourceError::LibraryNotFound(library.to_string()))?;

        if section.type_ != "show" {
            warn!("Library '{}' has type '{}', expected 'show'", library, section.type_);
        }

        let mut shows = Vec::new();
        for metadata in self.client.get_shows(&section.key).await? {
            let Some(tvdb_id) = metadata.guids.iter().find_map(|g| parse_tvdb_from_guid(g)) else {
                warn!("Skipping '{}': no TVDB id in its GUIDs", metadata.title);
                continue;
            };

            let episodes = self.client.get_episodes(&metadata.rating_key).await?;
            debug!("'{}' has {} episodes", metadata.title, episodes.len());
            shows.push(build_show(tvdb_id, metadata.title, &episodes));
        }

        info!("Loaded {} shows from library {}", shows.len(), library);
        Ok(shows)
    }
}

/// Extract a TVDB series id from a Plex GUID.
///
/// Handles both `tvdb://81797` and the legacy agent form
/// `com.plexapp.agents.thetvdb://81797/1/1?lang=en`.
pub fn parse_tvdb_from_guid(guid: &str) -> Option<String> {
    let start = guid.find("tvdb://")?;
    let id = guid[start + 7..]
        .split(|c| c == '?' || c == '/')
        .next()?;
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

fn build_show(tvdb_id: String, title: String, episodes: &[EpisodeMetadata]) -> LibraryShow {
    let mut seasons: BTreeMap<u32, Vec<LibraryEpisode>> = BTreeMap::new();
    for ep in episodes {
        seasons.entry(ep.season).or_default().push(LibraryEpisode {
            number: ep.episode,
            watched: ep.watched,
        });
    }
    let seasons = seasons
        .into_iter()
        .map(|(number, episodes)| LibrarySeason::new(number, episodes))
        .collect();
    LibraryShow::new(tvdb_id, title, seasons)
}
