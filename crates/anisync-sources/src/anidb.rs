use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use crate::error::SourceError;
use crate::traits::{PageLookup, TrackerSession};

const ANIDB_ANIME_URL: &str = "https://anidb.net/anime";
const MAL_ANIME_URL_PREFIX: &str = "https://myanimelist.net/anime/";

/// Resource links in preference order. The visible brand icon comes first,
/// the hidden link is a fallback used on some page layouts.
const MAL_LINK_SELECTORS: [&str; 2] = ["a.i_icon.i_resource_mal.brand", "a.hide.mal"];

/// Reads the MAL id off an AniDB anime page, using the sync session's browser
pub struct AnidbLookup<'a> {
    session: &'a mut dyn TrackerSession,
}

impl<'a> AnidbLookup<'a> {
    pub fn new(session: &'a mut dyn TrackerSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl PageLookup for AnidbLookup<'_> {
    async fn lookup_tracking_id(&mut self, xref_id: &str) -> Result<Option<String>, SourceError> {
        let url = format!("{}/{}", ANIDB_ANIME_URL, xref_id);
        debug!("Looking up MAL id on {}", url);
        let html = self.session.page_html(&url).await?;
        Ok(extract_mal_id(&html))
    }
}

/// Extract the MAL anime id from AniDB page HTML
pub fn extract_mal_id(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for sel in MAL_LINK_SELECTORS {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        let href = document
            .select(&selector)
            .filter_map(|a| a.value().attr("href"))
            .next();
        if let Some(id) = href.and_then(mal_id_from_href) {
            return Some(id);
        }
    }
    None
}

fn mal_id_from_href(href: &str) -> Option<String> {
    let rest = href
        .trim()
        .strip_prefix(MAL_ANIME_URL_PREFIX)
        .or_else(|| href.trim().strip_prefix("http://myanimelist.net/anime/"))?;
    let id: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AnimePage;
    use anisync_models::WatchStatus;

    struct HtmlSession {
        html: String,
        requested: Vec<String>,
    }

    #[async_trait]
    impl TrackerSession for HtmlSession {
        async fn attempt_login(&mut self) -> Result<bool, SourceError> {
            Ok(true)
        }
        async fn open_anime_page(&mut self, _id: &str) -> Result<Option<AnimePage>, SourceError> {
            Ok(None)
        }
        async fn set_status_and_episodes(&mut self, _s: WatchStatus, _e: u32) -> Result<(), SourceError> {
            Ok(())
        }
        async fn page_html(&mut self, url: &str) -> Result<String, SourceError> {
            self.requested.push(url.to_string());
            Ok(self.html.clone())
        }
        async fn quit(&mut self) -> Result<(), SourceError> {
            Ok(())
        }
    }

    #[test]
    fn test_extract_brand_link() {
        let html = r#"<html><body>
            <a class="i_icon i_resource_mal brand" href="https://myanimelist.net/anime/5114" title="MAL"></a>
        </body></html>"#;
        assert_eq!(extract_mal_id(html), Some("5114".to_string()));
    }

    #[test]
    fn test_extract_falls_back_to_hidden_link() {
        let html = r#"<div><a class="hide mal" href="https://myanimelist.net/anime/21/One_Piece"></a></div>"#;
        assert_eq!(extract_mal_id(html), Some("21".to_string()));
    }

    #[test]
    fn test_extract_without_link() {
        let html = r#"<div><a class="i_icon i_resource_ann brand" href="https://www.animenewsnetwork.com/encyclopedia/anime.php?id=1"></a></div>"#;
        assert_eq!(extract_mal_id(html), None);
        assert_eq!(extract_mal_id(""), None);
    }

    #[tokio::test]
    async fn test_lookup_requests_anidb_page() {
        let mut session = HtmlSession {
            html: r#"<a class="i_icon i_resource_mal brand" href="https://myanimelist.net/anime/1535"></a>"#.to_string(),
            requested: Vec::new(),
        };
        let found = AnidbLookup::new(&mut session).lookup_tracking_id("4563").await.unwrap();
        assert_eq!(found, Some("1535".to_string()));
        assert_eq!(session.requested, vec!["https://anidb.net/anime/4563"]);
    }
}
