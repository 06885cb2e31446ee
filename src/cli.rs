use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// iperf-report - Normalize iperf3 JSON results and summarize them
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// iperf3 JSON result files (bare `iperf3 --json` output or agent task results)
    #[clap(required = true, num_args = 1.., help_heading = "Core Options")]
    pub inputs: Vec<PathBuf>,

    /// Write a JSON report with per-test records and the aggregate
    #[clap(short = 'o', long)]
    pub output_file: Option<PathBuf>,

    /// How to print results on stdout
    #[clap(short = 'f', long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Record unreadable files as failed tests instead of stopping
    #[clap(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Show per-interval sparklines in table output
    #[clap(long, default_value_t = false)]
    pub sparkline: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// Stdout rendering
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable table
    #[clap(name = "table")]
    Table,

    /// Canonical records and aggregate as JSON
    #[clap(name = "json")]
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
