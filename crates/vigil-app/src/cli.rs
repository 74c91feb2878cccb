//! CLI argument definitions for the Vigil application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use vigil_core::{Category, Severity, Validation};
use vigil_store::{Filter, OccurrenceFilters};

/// Vigil: broadcast anomaly monitoring and occurrence review.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the detection loop with the operator console on stdin.
    Monitor {
        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Feed a JSON array of detection events through the adapter and print a review page.
    Replay(ReplayArgs),

    /// Print the severity for an anomaly duration.
    Classify {
        /// Anomaly duration in seconds.
        #[arg(allow_negative_numbers = true)]
        seconds: i64,
    },
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON file holding the detection events.
    pub file: PathBuf,

    /// 1-indexed page to print.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Items per page (defaults to review.page_size from config).
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Severity filter: C, B, A, X or any.
    #[arg(long, default_value = "any")]
    pub severity: Filter<Severity>,

    /// Review status filter: unreviewed, confirmed, false_positive or any.
    #[arg(long, default_value = "any")]
    pub status: Filter<Validation>,

    /// Category code filter, or any.
    #[arg(long, default_value = "any")]
    pub category: Filter<Category>,

    /// Case-insensitive free-text search.
    #[arg(long, default_value = "")]
    pub text: String,

    /// Program name filter, or any.
    #[arg(long, default_value = "any")]
    pub program: Filter<String>,

    /// Program category filter, or any.
    #[arg(long, default_value = "any")]
    pub program_category: Filter<String>,
}

impl ReplayArgs {
    pub fn filters(&self) -> OccurrenceFilters {
        OccurrenceFilters {
            text: self.text.clone(),
            severity: self.severity.clone(),
            validation: self.status.clone(),
            category: self.category.clone(),
            program_category: self.program_category.clone(),
            program_name: self.program.clone(),
        }
    }

    /// Priority: --page-size flag > config file value.
    pub fn resolve_page_size(&self, config_page_size: usize) -> usize {
        self.page_size.unwrap_or(config_page_size)
    }
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > VIGIL_CONFIG env var > platform default (~/.vigil/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("VIGIL_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value. RUST_LOG still wins
    /// over both when the subscriber is built.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".vigil").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".vigil").join("config.toml");
    }
    PathBuf::from("config.toml")
}
