//! End-to-end extraction pipeline: URL → rendered page → table → delimited file.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument};
use url::Url;

use statgrab_browser::PageSource;
use statgrab_export::ExportSummary;
use statgrab_shared::{AppConfig, ExportOptions, Result, StatgrabError, Table, TableConfig};

/// Configuration for a single pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Page to fetch.
    pub url: Url,
    /// Table location and cell rules.
    pub table: TableConfig,
    /// Destination file.
    pub output_path: PathBuf,
    /// Delimiter and index-column settings.
    pub export: ExportOptions,
}

impl RunConfig {
    /// Validate `config` and derive the runtime settings for one run.
    pub fn from_app(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let url = Url::parse(&config.source.url).map_err(|e| {
            StatgrabError::config(format!("invalid source url {:?}: {e}", config.source.url))
        })?;

        Ok(Self {
            url,
            table: config.table.clone(),
            output_path: config.output.path.clone(),
            export: config.output.export_options()?,
        })
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunResult {
    /// The extracted table.
    pub table: Table,
    /// What was written.
    pub export: ExportSummary,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &RunResult) {}
}

/// Run the full pipeline against `source`.
///
/// 1. Fetch the rendered page (waits for the table rows to appear)
/// 2. Extract the table
/// 3. Write the delimited file
///
/// Every stage failure aborts the run; nothing is written unless the whole
/// table was extracted and validated.
#[instrument(skip_all, fields(url = %config.url, out = %config.output_path.display()))]
pub async fn run<S: PageSource>(
    source: &S,
    config: &RunConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let start = Instant::now();

    info!("starting extraction run");

    // --- Phase 1: Fetch ---
    progress.phase("Fetching page");
    let html = source
        .fetch(&config.url, &config.table.rows_selector())
        .await?;

    // --- Phase 2: Extract ---
    progress.phase("Extracting table");
    let table = statgrab_extract::extract_table(&html, &config.table)?;

    // --- Phase 3: Export ---
    progress.phase("Writing output");
    let export = statgrab_export::write_table(&table, &config.output_path, &config.export)?;

    let result = RunResult {
        table,
        export,
        elapsed: start.elapsed(),
    };

    info!(
        rows = result.table.len(),
        columns = result.table.width(),
        elapsed_ms = result.elapsed.as_millis(),
        "extraction run complete"
    );

    progress.done(&result);
    Ok(result)
}
