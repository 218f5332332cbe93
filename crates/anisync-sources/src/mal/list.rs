use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use anisync_models::{TrackedEntry, TrackingList};

use crate::error::SourceError;
use crate::traits::TrackingListFetcher;

const MAL_BASE_URL: &str = "https://myanimelist.net";
/// MAL serves the list in pages of this many rows
const PAGE_SIZE: usize = 300;

/// Reads a user's public anime list (all statuses) from MAL
pub struct MalListClient {
    client: Client,
    base_url: String,
}

impl MalListClient {
    pub fn new() -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!("anisync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::http(MAL_BASE_URL, e))?;
        Ok(Self {
            client,
            base_url: MAL_BASE_URL.to_string(),
        })
    }

    async fn fetch_page(&self, username: &str, offset: usize) -> Result<Vec<Value>, SourceError> {
        let url = format!(
            "{}/animelist/{}/load.json?status=7&offset={}",
            self.base_url, username, offset
        );
        debug!("Fetching MAL list page {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::http(&url, e))?;

        if !response.status().is_success() {
            return Err(SourceError::Response {
                url,
                message: format!("status {}", response.status()),
            });
        }

        let json: Value = response.json().await.map_err(|e| SourceError::http(&url, e))?;
        match json {
            Value::Array(rows) => Ok(rows),
            other => Err(SourceError::Response {
                url,
                message: format!("expected a JSON array, got {}", other),
            }),
        }
    }
}

#[async_trait]
impl TrackingListFetcher for MalListClient {
    async fn fetch_list(&self, username: &str) -> Result<TrackingList, SourceError> {
        info!("Loading MyAnimeList list for {}", username);
        let mut list = TrackingList::new();
        let mut offset = 0;

        loop {
            let rows = self.fetch_page(username, offset).await?;
            let count = rows.len();
            for (id, entry) in rows.iter().filter_map(parse_list_row) {
                list.insert(id, entry);
            }
            if count < PAGE_SIZE {
                break;
            }
            offset += count;
        }

        info!("Loaded {} list entries", list.len());
        Ok(list)
    }
}

/// `anime_num_episodes` is kept as reported, so an airing show reads `Some(0)`
fn parse_list_row(row: &Value) -> Option<(String, TrackedEntry)> {
    let id = match row.get("anime_id")? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    let num_watched_episodes = row
        .get("num_watched_episodes")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let anime_num_episodes = row
        .get("anime_num_episodes")
        .and_then(|v| v.as_u64())
        .map(|n| n as u32);

    Some((
        id,
        TrackedEntry {
            num_watched_episodes,
            anime_num_episodes,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_list_row() {
        let row = json!({
            "status": 2,
            "anime_id": 5114,
            "num_watched_episodes": 64,
            "anime_num_episodes": 64,
            "anime_title": "Fullmetal Alchemist: Brotherhood"
        });
        let (id, entry) = parse_list_row(&row).unwrap();
        assert_eq!(id, "5114");
        assert_eq!(entry.num_watched_episodes, 64);
        assert_eq!(entry.anime_num_episodes, Some(64));
    }

    #[test]
    fn test_airing_show_keeps_zero_total() {
        let row = json!({"anime_id": 21, "num_watched_episodes": 1000, "anime_num_episodes": 0});
        let (_, entry) = parse_list_row(&row).unwrap();
        assert_eq!(entry.anime_num_episodes, Some(0));

        let missing = json!({"anime_id": 21, "num_watched_episodes": 3});
        let (_, entry) = parse_list_row(&missing).unwrap();
        assert_eq!(entry.anime_num_episodes, None);
    }

    #[test]
    fn test_row_without_id_is_skipped() {
        assert!(parse_list_row(&json!({"num_watched_episodes": 3})).is_none());
    }
}
