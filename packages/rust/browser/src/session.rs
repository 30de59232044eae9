//! WebDriver-backed page fetcher.
//!
//! One fetch = one driver + one browser session. The session is quit and the
//! driver stopped on every exit path; a failed quit is logged, never returned.

use std::time::Duration;

use thirtyfour::prelude::*;
use tracing::{debug, info, instrument, warn};
use url::Url;

use statgrab_shared::{BrowserConfig, Result, StatgrabError};

use crate::PageSource;
use crate::driver::{DriverEndpoint, DriverProcess};

/// Fetches fully rendered pages through a Chrome WebDriver session.
#[derive(Debug, Clone)]
pub struct BrowserFetcher {
    config: BrowserConfig,
}

impl BrowserFetcher {
    /// Create a fetcher with the given browser configuration.
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

impl PageSource for BrowserFetcher {
    #[instrument(skip_all, fields(url = %url, wait_for = %wait_for))]
    async fn fetch(&self, url: &Url, wait_for: &str) -> Result<String> {
        let endpoint = DriverEndpoint::resolve(&self.config)?;
        let startup_timeout = Duration::from_secs(self.config.startup_timeout_secs);
        let driver = DriverProcess::start(&endpoint, startup_timeout).await?;
        debug!(
            server_url = driver.server_url(),
            spawned = driver.is_spawned(),
            "driver ready"
        );

        let session = match open_session(driver.server_url(), &self.config).await {
            Ok(session) => session,
            Err(e) => {
                driver.stop().await;
                return Err(e);
            }
        };

        let rendered = render(&session, url, wait_for, &self.config).await;

        close_session(session).await;
        driver.stop().await;

        let html = rendered?;
        info!(html_len = html.len(), "page rendered");
        Ok(html)
    }
}

/// Start a Chrome session on the WebDriver server at `server_url`.
async fn open_session(server_url: &str, config: &BrowserConfig) -> Result<WebDriver> {
    let environment = |e: WebDriverError| {
        StatgrabError::Environment(format!("failed to start browser session: {e}"))
    };

    let mut caps = DesiredCapabilities::chrome();
    if config.headless {
        caps.set_headless().map_err(environment)?;
    }
    for arg in &config.args {
        caps.add_arg(arg).map_err(environment)?;
    }
    if let Some(binary) = &config.binary {
        caps.set_binary(&binary.to_string_lossy()).map_err(environment)?;
    }

    let session = WebDriver::new(server_url, caps).await.map_err(environment)?;
    debug!(server_url, headless = config.headless, "browser session started");
    Ok(session)
}

/// Navigate to `url`, wait for `wait_for` to appear, then read the markup.
async fn render(
    session: &WebDriver,
    url: &Url,
    wait_for: &str,
    config: &BrowserConfig,
) -> Result<String> {
    let load_timeout = Duration::from_secs(config.page_load_timeout_secs);
    match tokio::time::timeout(load_timeout, session.goto(url.as_str())).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return Err(StatgrabError::Fetch(format!("navigation to {url} failed: {e}")));
        }
        Err(_) => {
            return Err(StatgrabError::Fetch(format!(
                "navigation to {url} timed out after {}s",
                load_timeout.as_secs()
            )));
        }
    }
    debug!("navigation complete, waiting for table");

    let wait_timeout = Duration::from_secs(config.wait_timeout_secs);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    session
        .query(By::Css(wait_for))
        .wait(wait_timeout, poll_interval)
        .first()
        .await
        .map_err(|e| {
            StatgrabError::Fetch(format!(
                "timed out after {}s waiting for {wait_for}: {e}",
                wait_timeout.as_secs()
            ))
        })?;

    session
        .source()
        .await
        .map_err(|e| StatgrabError::Fetch(format!("failed to read page source: {e}")))
}

async fn close_session(session: WebDriver) {
    match session.quit().await {
        Ok(()) => debug!("browser session closed"),
        Err(e) => warn!(error = %e, "failed to quit browser session"),
    }
}
