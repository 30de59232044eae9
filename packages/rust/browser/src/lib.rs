//! Page fetching: rendered HTML from a real browser, or from a saved file.
//!
//! This crate provides:
//! - [`PageSource`]: the seam the pipeline fetches through
//! - [`BrowserFetcher`]: WebDriver-backed fetcher that waits for client-side rendering
//! - [`FilePageSource`]: reads a previously saved document (offline mode)
//! - [`driver`]: chromedriver resolution and process lifetime

pub mod driver;
mod session;

use std::future::Future;
use std::path::PathBuf;

use tracing::debug;
use url::Url;

use statgrab_shared::{Result, StatgrabError};

pub use driver::{DriverEndpoint, DriverProcess};
pub use session::BrowserFetcher;

/// Something that can produce the rendered markup of a page.
pub trait PageSource {
    /// Return the document markup for `url` once an element matching the
    /// CSS selector `wait_for` is present.
    fn fetch(&self, url: &Url, wait_for: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Serves a saved HTML document regardless of the requested URL.
#[derive(Debug, Clone)]
pub struct FilePageSource {
    path: PathBuf,
}

impl FilePageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PageSource for FilePageSource {
    async fn fetch(&self, url: &Url, _wait_for: &str) -> Result<String> {
        debug!(%url, path = %self.path.display(), "reading saved document");
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StatgrabError::io(&self.path, e))
    }
}
