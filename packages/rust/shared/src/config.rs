//! Application configuration for statgrab.
//!
//! User config lives at `~/.statgrab/statgrab.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, StatgrabError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "statgrab.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".statgrab";

// ---------------------------------------------------------------------------
// Config structs (matching statgrab.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Page to scrape.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where the table lives in the page and how its cells are read.
    #[serde(default)]
    pub table: TableConfig,

    /// Browser automation settings.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Export settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Statistics page URL.
    #[serde(default = "default_url")]
    pub url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

fn default_url() -> String {
    "https://www.whoscored.com/Statistics".into()
}

/// What to do when a disciplinary cell lacks one of its marker elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingMarkerPolicy {
    /// Abort the run with [`StatgrabError::MissingField`].
    #[default]
    Error,
    /// Use an empty string for the missing marker.
    Empty,
}

/// `[table]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Id of the element wrapping the statistics table.
    #[serde(default = "default_container_id")]
    pub container_id: String,

    /// Id of the table inside the container.
    #[serde(default = "default_table_id")]
    pub table_id: String,

    /// Header name of the disciplinary column. Empty disables name matching.
    #[serde(default = "default_disciplinary_header")]
    pub disciplinary_header: String,

    /// Column index used when no header carries `disciplinary_header`.
    #[serde(default = "default_disciplinary_index")]
    pub disciplinary_index: usize,

    /// Class of the yellow-card marker element.
    #[serde(default = "default_yellow_class")]
    pub yellow_class: String,

    /// Class of the red-card marker element.
    #[serde(default = "default_red_class")]
    pub red_class: String,

    /// Joins the yellow and red marker texts.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Behavior when a marker element is absent.
    #[serde(default)]
    pub missing_marker: MissingMarkerPolicy,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            container_id: default_container_id(),
            table_id: default_table_id(),
            disciplinary_header: default_disciplinary_header(),
            disciplinary_index: default_disciplinary_index(),
            yellow_class: default_yellow_class(),
            red_class: default_red_class(),
            separator: default_separator(),
            missing_marker: MissingMarkerPolicy::default(),
        }
    }
}

impl TableConfig {
    /// CSS selector matching the body rows of the configured table.
    ///
    /// The page fetcher waits on this selector before reading the markup.
    pub fn rows_selector(&self) -> String {
        format!(
            r#"[id="{}"] [id="{}"] tbody tr"#,
            self.container_id, self.table_id
        )
    }
}

fn default_container_id() -> String {
    "top-team-stats-summary".into()
}
fn default_table_id() -> String {
    "top-team-stats-summary-grid".into()
}
fn default_disciplinary_header() -> String {
    "Discipline".into()
}
fn default_disciplinary_index() -> usize {
    4
}
fn default_yellow_class() -> String {
    "yellow-card-box".into()
}
fn default_red_class() -> String {
    "red-card-box".into()
}
fn default_separator() -> String {
    "|".into()
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Path to the chromedriver executable. Resolved on `PATH` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_path: Option<PathBuf>,

    /// Already-running WebDriver server. When set, no driver is spawned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webdriver_url: Option<String>,

    /// Browser binary to launch instead of the driver's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,

    /// Port for a locally spawned driver.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Run the browser without a window.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Extra browser command-line arguments.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Seconds to wait for a spawned driver to accept connections.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,

    /// Seconds allowed for the initial navigation.
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,

    /// Seconds to wait for the table rows to render.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,

    /// Milliseconds between render checks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            driver_path: None,
            webdriver_url: None,
            binary: None,
            port: default_port(),
            headless: true,
            args: default_args(),
            startup_timeout_secs: default_startup_timeout(),
            page_load_timeout_secs: default_page_load_timeout(),
            wait_timeout_secs: default_wait_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_port() -> u16 {
    9515
}
fn default_true() -> bool {
    true
}
fn default_args() -> Vec<String> {
    vec!["--window-size=1920,1080".into()]
}
fn default_startup_timeout() -> u64 {
    10
}
fn default_page_load_timeout() -> u64 {
    30
}
fn default_wait_timeout() -> u64 {
    20
}
fn default_poll_interval() -> u64 {
    500
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination file.
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// Field delimiter (a single ASCII character).
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Prepend a positional index column.
    #[serde(default)]
    pub write_index: bool,

    /// Rows shown in the preview printed after export.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            delimiter: default_delimiter(),
            write_index: false,
            preview_rows: default_preview_rows(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("data").join("summary_data.csv")
}
fn default_delimiter() -> String {
    ",".into()
}
fn default_preview_rows() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Export options (runtime, derived from [output])
// ---------------------------------------------------------------------------

/// Runtime export options, derived from `[output]` after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Whether a leading index column is written (and expected on read).
    pub write_index: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            write_index: false,
        }
    }
}

impl OutputConfig {
    /// Parse the delimiter into a single byte.
    pub fn delimiter_byte(&self) -> Result<u8> {
        let bytes = self.delimiter.as_bytes();
        match bytes {
            [b] if b.is_ascii() => Ok(*b),
            _ if self.delimiter == "\\t" => Ok(b'\t'),
            _ => Err(StatgrabError::config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            ))),
        }
    }

    /// Build runtime export options.
    pub fn export_options(&self) -> Result<ExportOptions> {
        Ok(ExportOptions {
            delimiter: self.delimiter_byte()?,
            write_index: self.write_index,
        })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Check values that serde cannot: URL syntax, identifiers and class
    /// names, delimiter width, poll interval.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.source.url).map_err(|e| {
            StatgrabError::config(format!("invalid source url {:?}: {e}", self.source.url))
        })?;

        if let Some(remote) = &self.browser.webdriver_url {
            Url::parse(remote).map_err(|e| {
                StatgrabError::config(format!("invalid webdriver_url {remote:?}: {e}"))
            })?;
        }

        let required = [
            ("table.container_id", &self.table.container_id),
            ("table.table_id", &self.table.table_id),
            ("table.yellow_class", &self.table.yellow_class),
            ("table.red_class", &self.table.red_class),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(StatgrabError::config(format!("{key} must not be empty")));
            }
        }

        for (key, class) in [
            ("table.yellow_class", &self.table.yellow_class),
            ("table.red_class", &self.table.red_class),
        ] {
            if class.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
                return Err(StatgrabError::config(format!(
                    "{key} must be a single class name, got {class:?}"
                )));
            }
        }

        if self.browser.poll_interval_ms == 0 {
            return Err(StatgrabError::config(
                "browser.poll_interval_ms must be greater than zero",
            ));
        }

        self.output.delimiter_byte()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.statgrab/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| StatgrabError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.statgrab/statgrab.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| StatgrabError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        StatgrabError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| StatgrabError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| StatgrabError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| StatgrabError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("top-team-stats-summary-grid"));
        assert!(toml_str.contains("yellow-card-box"));
        assert!(!toml_str.contains("driver_path"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.table.disciplinary_index, 4);
        assert_eq!(parsed.table.missing_marker, MissingMarkerPolicy::Error);
        assert_eq!(parsed.browser.port, 9515);
        assert_eq!(parsed.output.path, PathBuf::from("data/summary_data.csv"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[table]
disciplinary_index = 6
missing_marker = "empty"

[browser]
driver_path = "/opt/drivers/chromedriver"
headless = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.table.disciplinary_index, 6);
        assert_eq!(config.table.missing_marker, MissingMarkerPolicy::Empty);
        assert_eq!(config.table.separator, "|");
        assert_eq!(
            config.browser.driver_path.as_deref(),
            Some(Path::new("/opt/drivers/chromedriver"))
        );
        assert!(!config.browser.headless);
        assert_eq!(config.source.url, "https://www.whoscored.com/Statistics");
    }

    #[test]
    fn rows_selector_scopes_to_container() {
        let table = TableConfig::default();
        assert_eq!(
            table.rows_selector(),
            r#"[id="top-team-stats-summary"] [id="top-team-stats-summary-grid"] tbody tr"#
        );
    }

    #[test]
    fn delimiter_parsing() {
        let mut output = OutputConfig::default();
        assert_eq!(output.delimiter_byte().unwrap(), b',');

        output.delimiter = "\t".into();
        assert_eq!(output.delimiter_byte().unwrap(), b'\t');

        output.delimiter = "\\t".into();
        assert_eq!(output.delimiter_byte().unwrap(), b'\t');

        output.delimiter = ";;".into();
        assert!(output.delimiter_byte().is_err());

        output.delimiter = "é".into();
        assert!(output.delimiter_byte().is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(AppConfig::default().validate().is_ok());

        let mut config = AppConfig::default();
        config.source.url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.table.table_id = "  ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("table.table_id"));

        let mut config = AppConfig::default();
        config.table.red_class = "red card".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("table.red_class"));

        let mut config = AppConfig::default();
        config.browser.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let err = load_config_from(Path::new("/nonexistent/statgrab.toml")).unwrap_err();
        assert!(matches!(err, StatgrabError::Io { .. }));
    }

    #[test]
    fn init_config_at_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("statgrab.toml");

        init_config_at(&path).unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.table.table_id, "top-team-stats-summary-grid");
        assert!(config.validate().is_ok());
    }
}
