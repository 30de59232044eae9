//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use statgrab_browser::{BrowserFetcher, FilePageSource, PageSource};
use statgrab_core::{ProgressReporter, RunConfig, RunResult};
use statgrab_shared::{
    AppConfig, MissingMarkerPolicy, config_file_path, init_config_at, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// statgrab: export a rendered statistics table to CSV.
#[derive(Parser)]
#[command(
    name = "statgrab",
    version,
    about = "Scrape a dynamically rendered statistics table into a CSV file.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.statgrab/statgrab.toml.
    #[arg(long, env = "STATGRAB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Options shared by the commands that produce an export.
#[derive(clap::Args)]
pub(crate) struct ExportArgs {
    /// Output file (defaults to data/summary_data.csv).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Prepend a positional index column.
    #[arg(long)]
    pub write_index: bool,

    /// Use an empty string when a card marker is missing instead of failing.
    #[arg(long)]
    pub empty_missing: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch the page in a browser, extract the table, and export it.
    Run {
        /// Statistics page URL.
        #[arg(long)]
        url: Option<String>,

        /// Path to the chromedriver executable.
        #[arg(long)]
        driver: Option<PathBuf>,

        /// Use an already-running WebDriver server instead of spawning one.
        #[arg(long, env = "STATGRAB_WEBDRIVER_URL")]
        webdriver_url: Option<String>,

        /// Show the browser window.
        #[arg(long)]
        headful: bool,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Extract the table from a saved HTML document (no browser).
    Extract {
        /// Saved, fully rendered HTML page.
        #[arg(long)]
        html: PathBuf,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Print the first rows of an exported file.
    Show {
        /// Exported file.
        file: PathBuf,

        /// Number of rows to print.
        #[arg(short, long)]
        rows: Option<usize>,

        /// The file has a leading index column.
        #[arg(long)]
        write_index: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "statgrab=info",
        1 => "statgrab=debug",
        _ => "statgrab=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // stdout carries the table preview
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            url,
            driver,
            webdriver_url,
            headful,
            export,
        } => {
            let mut config = resolve_config(config_path)?;
            if let Some(url) = url {
                config.source.url = url;
            }
            if let Some(driver) = driver {
                config.browser.driver_path = Some(driver);
            }
            if webdriver_url.is_some() {
                config.browser.webdriver_url = webdriver_url;
            }
            if headful {
                config.browser.headless = false;
            }
            apply_export_args(&mut config, &export);

            let fetcher = BrowserFetcher::new(config.browser.clone());
            cmd_extract(&fetcher, &config).await
        }
        Command::Extract { html, export } => {
            let mut config = resolve_config(config_path)?;
            apply_export_args(&mut config, &export);

            if !html.is_file() {
                return Err(eyre!("no HTML document found at '{}'", html.display()));
            }
            let source = FilePageSource::new(html);
            cmd_extract(&source, &config).await
        }
        Command::Show {
            file,
            rows,
            write_index,
        } => cmd_show(config_path, &file, rows, write_index),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load the `--config` file if given, else the user config (or defaults).
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn apply_export_args(config: &mut AppConfig, args: &ExportArgs) {
    if let Some(out) = &args.out {
        config.output.path = out.clone();
    }
    if args.write_index {
        config.output.write_index = true;
    }
    if args.empty_missing {
        config.table.missing_marker = MissingMarkerPolicy::Empty;
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_extract<S: PageSource>(source: &S, config: &AppConfig) -> Result<()> {
    let run_config = RunConfig::from_app(config)?;

    info!(
        url = %run_config.url,
        out = %run_config.output_path.display(),
        "extracting statistics table"
    );

    let reporter = CliProgress::new();
    let result = statgrab_core::run(source, &run_config, &reporter).await?;
    drop(reporter);

    println!();
    println!("  Table exported!");
    println!("  Rows:    {}", result.export.rows);
    println!("  Columns: {}", result.export.columns);
    println!("  Path:    {}", result.export.path.display());
    println!(
        "  Time:    {:.1}s",
        result.elapsed.as_secs_f64()
    );
    println!();

    if config.output.preview_rows > 0 {
        print!(
            "{}",
            statgrab_export::render_preview(&result.table, config.output.preview_rows)
        );
    }

    Ok(())
}

fn cmd_show(
    config_path: Option<&Path>,
    file: &Path,
    rows: Option<usize>,
    write_index: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let mut opts = config.output.export_options()?;
    opts.write_index |= write_index;

    let table = statgrab_export::read_table(file, &opts)?;
    let limit = rows.unwrap_or(config.output.preview_rows);
    print!("{}", statgrab_export::render_preview(&table, limit));
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };
    if path.exists() {
        return Err(eyre!(
            "config file already exists at '{}'",
            path.display()
        ));
    }

    init_config_at(&path)?;
    println!("Created config file at {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    config.validate()?;
    let rendered = toml::to_string_pretty(&config)?;
    print!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
