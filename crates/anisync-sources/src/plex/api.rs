use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub key: String,
    pub type_: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct ShowMetadata {
    pub rating_key: String,
    pub title: String,
    /// Every GUID Plex reports, including the legacy agent `guid` attribute
    pub guids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeMetadata {
    pub season: u32,
    pub episode: u32,
    pub watched: bool,
}

pub struct PlexHttpClient {
    client: Client,
    server_url: String,
}

impl PlexHttpClient {
    pub fn new(token: &str, server_url: &str) -> Result<Self> {
        let client = Client::builder()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-token"),
                    reqwest::header::HeaderValue::from_str(token)
                        .context("Invalid token format")?,
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-client-identifier"),
                    reqwest::header::HeaderValue::from_static("anisync"),
                );
                headers
            })
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.server_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to request {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Plex request {} failed: {}", url, response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    pub async fn get_libraries(&self) -> Result<Vec<LibraryInfo>> {
        let json = self.get_json("/library/sections").await?;
        Ok(parse_libraries(&json))
    }

    pub async fn get_shows(&self, library_key: &str) -> Result<Vec<ShowMetadata>> {
        let json = self
            .get_json(&format!("/library/sections/{}/all?type=2&includeGuids=1", library_key))
            .await?;
        let items = metadata_items(&json);
        debug!("Plex get_shows: Found {} items in library", items.len());
        Ok(items.iter().filter_map(parse_show_item).collect())
    }

    /// All episodes of a show across every season
    pub async fn get_episodes(&self, rating_key: &str) -> Result<Vec<EpisodeMetadata>> {
        let json = self
            .get_json(&format!("/library/metadata/{}/allLeaves", rating_key))
            .await?;
        Ok(metadata_items(&json).iter().filter_map(parse_episode_item).collect())
    }
}

fn metadata_items(json: &Value) -> Vec<Value> {
    json.get("MediaContainer")
        .and_then(|mc| mc.get("Metadata"))
        .and_then(|m| m.as_array())
        .cloned()
        .unwrap_or_default()
}

pub(crate) fn parse_libraries(json: &Value) -> Vec<LibraryInfo> {
    let directories = json
        .get("MediaContainer")
        .and_then(|mc| mc.get("Directory"))
        .and_then(|d| d.as_array());

    let Some(directories) = directories else {
        return Vec::new();
    };

    directories
        .iter()
        .map(|dir| {
            let field = |name: &str| {
                dir.get(name)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string()
            };
            LibraryInfo {
                key: field("key"),
                type_: field("type"),
                title: field("title"),
            }
        })
        .collect()
}

pub(crate) fn parse_show_item(item: &Value) -> Option<ShowMetadata> {
    let rating_key = match item.get("ratingKey")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let title = item.get("title")?.as_str()?.to_string();

    let mut guids = Vec::new();
    if let Some(legacy) = item.get("guid").and_then(|g| g.as_str()) {
        guids.push(legacy.to_string());
    }
    if let Some(array) = item.get("Guid").and_then(|g| g.as_array()) {
        guids.extend(
            array
                .iter()
                .filter_map(|g| g.get("id").and_then(|i| i.as_str()).or_else(|| g.as_str()))
                .map(str::to_string),
        );
    }

    Some(ShowMetadata {
        rating_key,
        title,
        guids,
    })
}

pub(crate) fn parse_episode_item(item: &Value) -> Option<EpisodeMetadata> {
    let season = item.get("parentIndex")?.as_u64()? as u32;
    let episode = item.get("index")?.as_u64()? as u32;
    let watched = item
        .get("viewCount")
        .and_then(|v| v.as_u64())
        .map(|count| count > 0)
        .unwrap_or(false);
    Some(EpisodeMetadata {
        season,
        episode,
        watched,
    })
}
