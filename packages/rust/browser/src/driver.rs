//! chromedriver resolution and process lifetime.
//!
//! A spawned driver is killed when its [`DriverProcess`] is stopped or
//! dropped, so no exit path leaks a driver (and the browsers it owns).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use statgrab_shared::{BrowserConfig, Result, StatgrabError};

/// Executable looked up on `PATH` when no driver path is configured.
const DRIVER_EXECUTABLE: &str = "chromedriver";

/// Interval between readiness probes of a freshly spawned driver.
const READY_PROBE_MS: u64 = 100;

// ---------------------------------------------------------------------------
// Endpoint resolution
// ---------------------------------------------------------------------------

/// Where the WebDriver server comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEndpoint {
    /// A server that is already running; nothing is spawned.
    Remote(String),
    /// A driver executable to spawn on `port`.
    Local { path: PathBuf, port: u16 },
}

impl DriverEndpoint {
    /// Resolve the endpoint: configured remote URL, then configured driver
    /// path, then `chromedriver` on `PATH`.
    pub fn resolve(config: &BrowserConfig) -> Result<Self> {
        if let Some(url) = &config.webdriver_url {
            return Ok(Self::Remote(url.clone()));
        }

        let path = match &config.driver_path {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => {
                return Err(StatgrabError::Environment(format!(
                    "driver executable not found at {}",
                    path.display()
                )));
            }
            None => which::which(DRIVER_EXECUTABLE).map_err(|e| {
                StatgrabError::Environment(format!(
                    "{DRIVER_EXECUTABLE} not found on PATH ({e}); \
                     set browser.driver_path or browser.webdriver_url"
                ))
            })?,
        };

        Ok(Self::Local {
            path,
            port: config.port,
        })
    }
}

// ---------------------------------------------------------------------------
// Driver process
// ---------------------------------------------------------------------------

/// A reachable WebDriver server, owning the driver process if we spawned it.
#[derive(Debug)]
pub struct DriverProcess {
    server_url: String,
    child: Option<Child>,
}

impl DriverProcess {
    /// Connect to a remote endpoint, or spawn a local driver and wait until
    /// it accepts connections.
    pub async fn start(endpoint: &DriverEndpoint, startup_timeout: Duration) -> Result<Self> {
        let (path, port) = match endpoint {
            DriverEndpoint::Remote(url) => {
                debug!(%url, "using running WebDriver server");
                return Ok(Self {
                    server_url: url.clone(),
                    child: None,
                });
            }
            DriverEndpoint::Local { path, port } => (path, *port),
        };

        // readiness is judged by connecting, so the port must start out free
        if let Err(e) = std::net::TcpListener::bind(("127.0.0.1", port)) {
            return Err(StatgrabError::Environment(format!(
                "port {port} is not available for {}: {e}",
                path.display()
            )));
        }

        let mut child = Command::new(path)
            .arg(format!("--port={port}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                StatgrabError::Environment(format!("failed to start {}: {e}", path.display()))
            })?;

        let started = Instant::now();
        loop {
            ensure_running(&mut child, path)?;

            if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                ensure_running(&mut child, path)?;
                break;
            }

            if started.elapsed() >= startup_timeout {
                // kill_on_drop reaps the child
                return Err(StatgrabError::Environment(format!(
                    "{} did not accept connections on port {port} within {startup_timeout:?}",
                    path.display()
                )));
            }

            tokio::time::sleep(Duration::from_millis(READY_PROBE_MS)).await;
        }

        info!(
            driver = %path.display(),
            port,
            startup_ms = started.elapsed().as_millis(),
            "driver started"
        );

        Ok(Self {
            server_url: format!("http://127.0.0.1:{port}"),
            child: Some(child),
        })
    }

    /// Base URL of the WebDriver server.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Whether this handle owns a spawned driver process.
    pub fn is_spawned(&self) -> bool {
        self.child.is_some()
    }

    /// Kill a spawned driver and wait for it to exit.
    pub async fn stop(mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Err(e) = child.kill().await {
            warn!(error = %e, "failed to stop driver process");
        } else {
            debug!("driver stopped");
        }
    }
}

/// Fail if the spawned driver has already exited.
fn ensure_running(child: &mut Child, path: &Path) -> Result<()> {
    match child.try_wait() {
        Ok(None) => Ok(()),
        Ok(Some(status)) => Err(StatgrabError::Environment(format!(
            "{} exited during startup ({status})",
            path.display()
        ))),
        Err(e) => Err(StatgrabError::Environment(format!(
            "failed to poll {}: {e}",
            path.display()
        ))),
    }
}
