use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use anisync_models::WatchStatus;

use crate::error::SourceError;
use crate::mal::browser::{self, BrowserOptions};
use crate::traits::{AnimePage, TrackerSession};

const MAL_LOGIN_URL: &str = "https://myanimelist.net/login.php?from=%2F";
const MAL_ANIME_URL: &str = "https://myanimelist.net/anime";

const PROFILE_MARKER: &str = ".header-profile-link";
const NOT_FOUND_MARKER: &str = ".message";
const ADD_TO_LIST_BUTTON: &str = "#showAddtolistAnime";
const TOTAL_EPISODES: &str = "#curEps";
const WATCHED_EPISODES_INPUT: &str = "#myinfo_watchedeps";
const ADD_BUTTON: &str = ".js-anime-add-button";
const UPDATE_BUTTON: &str = ".js-anime-update-button";

/// Consent dialogs, largest first. The bare `button` catches the small banner.
const PRIVACY_NOTICES: [&str; 3] = [".details_save--1ja7w", ".intro_acceptAll--23PPA", "button"];

const PAGE_SETTLE: Duration = Duration::from_secs(2);
const SIGNIN_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Chromium-driven session against MyAnimeList
pub struct MalBrowserSession {
    browser: Option<Browser>,
    handler_task: Option<tokio::task::JoinHandle<()>>,
    page: Page,
    username: String,
    password: String,
}

impl MalBrowserSession {
    pub async fn launch(
        options: &BrowserOptions,
        username: String,
        password: String,
    ) -> Result<Self, SourceError> {
        info!("Starting browser session");
        let (browser, handler_task) = browser::launch(options).await?;
        let page = browser.new_page("about:blank").await?;
        info!("Browser session started");

        Ok(Self {
            browser: Some(browser),
            handler_task: Some(handler_task),
            page,
            username,
            password,
        })
    }

    async fn goto(&self, url: &str) -> Result<(), SourceError> {
        debug!("Navigating to {}", url);
        self.page.goto(url).await?;
        sleep(PAGE_SETTLE).await;
        Ok(())
    }

    async fn element_exists(&self, selector: &str) -> bool {
        self.page.find_element(selector).await.is_ok()
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.element_exists(selector).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<(), SourceError> {
        let element = self.page.find_element(selector).await?;
        element.click().await?;
        Ok(())
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), SourceError> {
        let element = self.page.find_element(selector).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn accept_privacy_notices(&self) {
        for selector in PRIVACY_NOTICES {
            if self.element_exists(selector).await {
                if let Err(e) = self.click(selector).await {
                    debug!("Could not dismiss privacy notice {}: {}", selector, e);
                }
            }
        }
    }

    /// Run a script that returns a boolean, treating anything else as false
    async fn evaluate_flag(&self, script: String) -> Result<bool, SourceError> {
        let result = self.page.evaluate(script.as_str()).await?;
        Ok(result.value().and_then(|v| v.as_bool()).unwrap_or(false))
    }
}

#[async_trait]
impl TrackerSession for MalBrowserSession {
    async fn attempt_login(&mut self) -> Result<bool, SourceError> {
        self.goto(MAL_LOGIN_URL).await?;
        self.accept_privacy_notices().await;

        self.type_into("#loginUserName", &self.username).await?;
        self.type_into("#login-password", &self.password).await?;
        self.click(".pt16 .btn-form-submit").await?;

        debug!("Checking if login was successful");
        let signed_in = self.wait_for(PROFILE_MARKER, SIGNIN_CHECK_TIMEOUT).await;
        if signed_in {
            info!("Logged in successfully as user {}", self.username);
        }
        Ok(signed_in)
    }

    async fn open_anime_page(&mut self, tracking_id: &str) -> Result<Option<AnimePage>, SourceError> {
        self.goto(&format!("{}/{}", MAL_ANIME_URL, tracking_id)).await?;
        self.accept_privacy_notices().await;

        if self.element_exists(NOT_FOUND_MARKER).await {
            warn!("MAL has no anime page for id {}", tracking_id);
            return Ok(None);
        }

        if self.element_exists(ADD_TO_LIST_BUTTON).await {
            self.click(ADD_TO_LIST_BUTTON).await?;
            sleep(Duration::from_millis(500)).await;
        }

        let total = self.page.find_element(TOTAL_EPISODES).await?.inner_text().await?;
        Ok(Some(AnimePage {
            total_episodes: total.as_deref().and_then(parse_total_episodes),
        }))
    }

    async fn set_status_and_episodes(
        &mut self,
        status: WatchStatus,
        episodes: u32,
    ) -> Result<(), SourceError> {
        if !self.evaluate_flag(status_select_script(status)).await? {
            return Err(SourceError::browser(format!(
                "status option {} not found",
                status.code()
            )));
        }

        self.evaluate_flag(format!(
            "(() => {{ const el = document.querySelector('{}'); if (!el) return false; el.value = ''; return true; }})()",
            WATCHED_EPISODES_INPUT
        ))
        .await?;
        self.type_into(WATCHED_EPISODES_INPUT, &episodes.to_string()).await?;

        if self.element_exists(ADD_BUTTON).await {
            self.click(ADD_BUTTON).await?;
        } else {
            self.click(UPDATE_BUTTON).await?;
        }
        sleep(PAGE_SETTLE).await;
        Ok(())
    }

    async fn page_html(&mut self, url: &str) -> Result<String, SourceError> {
        self.goto(url).await?;
        Ok(self.page.content().await?)
    }

    async fn quit(&mut self) -> Result<(), SourceError> {
        if let Some(mut browser) = self.browser.take() {
            info!("Shutting down browser instance");
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Some(handler_task) = self.handler_task.take() {
                let _ = tokio::time::timeout(Duration::from_secs(2), handler_task).await;
            }
        }
        Ok(())
    }
}

/// `#curEps` reads `?` while a show is airing
fn parse_total_episodes(text: &str) -> Option<u32> {
    let text = text.trim();
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

/// The status code doubles as the option's position in the dropdown
fn status_select_script(status: WatchStatus) -> String {
    format!(
        "(() => {{ const opt = document.querySelector('#myinfo_status > option:nth-child({})'); if (!opt) return false; opt.selected = true; opt.parentElement.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
        status.code()
    )
}
