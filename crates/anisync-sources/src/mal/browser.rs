use anyhow::{anyhow, Result};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use which::which;

/// How to launch Chromium for a sync session
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    /// Profile directory, kept between passes so MAL cookies survive
    pub user_data_dir: PathBuf,
}

pub(crate) async fn launch(options: &BrowserOptions) -> Result<(Browser, tokio::task::JoinHandle<()>)> {
    tokio::fs::create_dir_all(&options.user_data_dir).await?;

    let chrome_path = match options.executable.clone().or_else(find_system_chromium) {
        Some(path) => path,
        None => fetch_chromium(&options.user_data_dir).await?,
    };

    let config = build_browser_config(&chrome_path, options)?;
    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

    let handler_task = tokio::spawn(async move {
        let mut error_count = 0;
        const MAX_ERRORS: usize = 10;

        while let Some(h) = handler.next().await {
            match h {
                Ok(_) => error_count = 0,
                Err(e) => {
                    error_count += 1;
                    warn!(
                        "Browser handler error (count: {}/{}): {:?}",
                        error_count, MAX_ERRORS, e
                    );
                    if error_count >= MAX_ERRORS {
                        error!("Browser handler received {} consecutive errors, giving up", error_count);
                        break;
                    }
                }
            }
        }
        debug!("Browser handler task ended");
    });

    Ok((browser, handler_task))
}

async fn fetch_chromium(user_data_dir: &Path) -> Result<PathBuf> {
    info!("No system Chromium found, downloading via BrowserFetcher...");
    let download_path = user_data_dir
        .parent()
        .ok_or_else(|| anyhow!("Could not determine parent directory"))?
        .join("chromium_downloads");
    tokio::fs::create_dir_all(&download_path).await?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&download_path)
            .build()
            .map_err(|e| anyhow!("Failed to create BrowserFetcherOptions: {}", e))?,
    );
    let fetched = fetcher
        .fetch()
        .await
        .map_err(|e| anyhow!("Failed to fetch Chromium: {}", e))?;
    info!("Chromium downloaded to: {:?}", fetched.executable_path);
    Ok(fetched.executable_path)
}

fn is_docker() -> bool {
    Path::new("/.dockerenv").exists()
        || std::fs::read_to_string("/proc/self/cgroup")
            .map(|s| s.contains("docker") || s.contains("containerd"))
            .unwrap_or(false)
}

fn find_system_chromium() -> Option<PathBuf> {
    let mut candidates = vec![
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/local/bin/chromium",
        "/usr/local/bin/chromium-browser",
        "/opt/chromium/chromium",
    ];
    if cfg!(target_os = "macos") {
        candidates.extend([
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/opt/homebrew/bin/chromium",
        ]);
    }

    candidates
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| which("chromium").or_else(|_| which("chromium-browser")).ok())
}

fn build_browser_config(chrome_path: &Path, options: &BrowserOptions) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

    // Containers have no display, so headless is forced there
    if options.headless || is_docker() {
        builder = builder.arg("--headless=new");
    } else {
        builder = builder.with_head();
    }

    if !cfg!(target_os = "macos") {
        builder = builder.arg("--no-sandbox").arg("--disable-dev-shm-usage");
    }

    builder = builder
        .arg("--disable-gpu")
        .arg("--disable-extensions")
        .arg("--disable-notifications")
        .arg("--log-level=3")
        .arg("--disable-sync")
        .arg("--disable-default-apps")
        .arg("--window-size=1280,900")
        .arg(format!("--user-data-dir={}", options.user_data_dir.display()))
        .arg("--user-agent=Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36");

    builder
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}
