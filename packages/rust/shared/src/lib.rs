//! Shared types, error model, and configuration for statgrab.
//!
//! This crate is the foundation depended on by all other statgrab crates.
//! It provides:
//! - [`StatgrabError`]: the unified error type
//! - The table data model ([`Table`], [`HeaderRow`], [`DataRow`])
//! - Configuration ([`AppConfig`], [`ExportOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrowserConfig, ExportOptions, MissingMarkerPolicy, OutputConfig, SourceConfig,
    TableConfig, config_dir, config_file_path, init_config_at, load_config, load_config_from,
};
pub use error::{Result, StatgrabError};
pub use types::{DataRow, HeaderRow, Table};
