//! Pipeline orchestration for statgrab.
//!
//! Ties together page fetching, table extraction, and export into a single
//! run (see [`pipeline::run`]).

pub mod pipeline;

pub use pipeline::{ProgressReporter, RunConfig, RunResult, SilentProgress, run};
