//! # iperf3 Result Normalization Library
//!
//! Turns raw iperf3 `--json` output into a stable canonical metrics record and
//! folds batches of those records into dashboard summary statistics.
//!
//! ## Supported Result Shapes
//!
//! - **TCP client**: transfer totals in `end.sum_sent`
//! - **TCP server**: transfer totals in `end.sum_received` (`sum_sent` zeroed)
//! - **UDP**: totals, jitter and loss in `end.sum`
//!
//! ## Architecture Overview
//!
//! - `raw`: typed model of the iperf3 document with its per-field default policy
//! - `intervals`: time-series extraction and the short-interval filter
//! - `normalize`: one raw document to one canonical record
//! - `metrics`: the canonical record types
//! - `results`: per-test records, batch aggregation and report output
//! - `utils`: unit conversion and human-readable formatting
//! - `cli`, `logging`, `error`: the command-line shell around the core
//!
//! The core (`raw`, `intervals`, `normalize`, `metrics`, aggregation and
//! formatting) is pure and synchronous: no I/O, no shared state. Independent
//! documents and batches can be processed on any thread.
//!
//! ## Usage Example
//!
//! ```rust
//! use iperf_report::{calculate_aggregate_metrics, parse_iperf_str, utils, TestRecord};
//!
//! let json = r#"{
//!     "start": {"test_start": {"protocol": "TCP", "num_streams": 1}},
//!     "intervals": [
//!         {"sum": {"start": 0.0, "end": 1.0, "seconds": 1.0, "bits_per_second": 1.5e9, "bytes": 187500000}}
//!     ],
//!     "end": {"sum_sent": {"seconds": 1.0, "bytes": 187500000, "bits_per_second": 1.5e9}}
//! }"#;
//!
//! let metrics = parse_iperf_str(json).expect("completed run");
//! assert_eq!(utils::format_throughput(metrics.avg_bits_per_second), "1.50 Gbps");
//!
//! let aggregate = calculate_aggregate_metrics(&[TestRecord::succeeded("client.json", metrics)]);
//! assert_eq!(aggregate.avg_throughput_gbps, 1.5);
//! ```

/// Command-line interface
///
/// Argument parsing with clap for the `iperf-report` binary.
pub mod cli;

/// Error types for loading result documents
pub mod error;

/// Interval extraction and filtering
///
/// Converts the raw `intervals[]` block into ordered interval metrics and
/// drops termination artifacts shorter than half a second.
pub mod intervals;

pub mod logging;

/// Canonical per-test metric types
///
/// Plain serializable records consumed by aggregation and rendering. They
/// carry no behavior beyond small derived lookups.
pub mod metrics;

/// Per-test normalization
///
/// Resolves protocol, summary block, duration, streams, endpoint and
/// protocol-specific fields from a raw document, applying the documented
/// fallbacks.
pub mod normalize;

/// Raw iperf3 document model
pub mod raw;

/// Per-test records, aggregation and report output
///
/// Provides:
/// - `TestRecord` entries wrapping a canonical record or a failure reason
/// - Batch aggregation, sequential or map-reduce via rayon
/// - Loading documents (bare or wrapped in an agent task envelope)
/// - Writing the consolidated JSON report
pub mod results;

pub mod utils;

pub use error::ReportError;
pub use metrics::{CanonicalTestMetrics, IntervalMetrics, Protocol, StreamIntervalMetrics, UdpMetrics};
pub use normalize::{normalize, parse_iperf_result, parse_iperf_str, parse_iperf_value};
pub use raw::RawTestResult;
pub use results::{
    calculate_aggregate_metrics, calculate_aggregate_metrics_parallel, AggregateAccumulator,
    AggregateMetrics, ReportWriter, TestRecord,
};

/// The current version of the crate
///
/// Written into report metadata so results can be traced back to the
/// normalizer that produced them.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default values and unit constants
pub mod defaults {
    /// Shortest interval window, in seconds, treated as a real measurement
    ///
    /// iperf3 emits a trailing partial interval when a run terminates; its
    /// throughput depends on when the timer fired, not on the network.
    pub const MIN_INTERVAL_SECONDS: f64 = 0.5;

    /// Bits per second in one Gbps (decimal units, as iperf3 reports)
    pub const BITS_PER_GBPS: f64 = 1_000_000_000.0;

    pub const BITS_PER_MBPS: f64 = 1_000_000.0;

    pub const BITS_PER_KBPS: f64 = 1_000.0;

    /// Bytes in one GB (decimal)
    pub const BYTES_PER_GB: f64 = 1_000_000_000.0;

    /// Decimal places kept for Gbps figures
    pub const THROUGHPUT_DECIMALS: i32 = 2;

    /// Decimal places kept for CPU percentages
    pub const CPU_DECIMALS: i32 = 1;

    /// Width of the sparkline column in table output
    pub const SPARKLINE_WIDTH: usize = 24;
}
