//! # Presentation Helpers
//!
//! Unit conversion and human-readable formatting for canonical and aggregate
//! records. Everything here is a pure function of its arguments and is safe
//! to call from the rendering layer on any thread.
//!
//! ## Key Functionality Categories
//!
//! - **Unit Conversion**: bits/s to Gbps, bytes to GB, fixed-decimal rounding
//! - **Formatting**: throughput, byte counts and CPU readings as display strings
//! - **Series Extraction**: sparkline data and single-test peak throughput
//! - **Display Helpers**: table rows and unicode sparklines for the CLI
//!
//! ## Usage Examples
//!
//! ```rust
//! use iperf_report::utils::*;
//!
//! assert_eq!(format_throughput(59_800_000_000.0), "59.80 Gbps");
//! assert_eq!(bps_to_gbps(1_234_567_890.0), 1.23);
//! assert_eq!(format_cpu(None), "n/a");
//! ```

use crate::{
    defaults::{
        BITS_PER_GBPS, BITS_PER_KBPS, BITS_PER_MBPS, BYTES_PER_GB, CPU_DECIMALS,
        THROUGHPUT_DECIMALS,
    },
    metrics::CanonicalTestMetrics,
};

/// Characters used to draw sparklines, lowest to highest
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Round a value to a fixed number of decimal places
///
/// Display figures are rounded once, at the end of a computation; internal
/// accumulation always stays at full precision.
///
/// ## Examples
///
/// ```rust
/// # use iperf_report::utils::round_to;
/// assert_eq!(round_to(59.8049, 2), 59.8);
/// assert_eq!(round_to(12.36, 1), 12.4);
/// assert_eq!(round_to(7.5, 0), 8.0);
/// ```
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Convert bits per second to Gbps with 2-decimal rounding
///
/// Zero and non-finite inputs convert to `0.0`.
///
/// ## Examples
///
/// ```rust
/// # use iperf_report::utils::bps_to_gbps;
/// assert_eq!(bps_to_gbps(5_000_000_000.0), 5.0);
/// assert_eq!(bps_to_gbps(59_804_123_456.0), 59.8);
/// assert_eq!(bps_to_gbps(f64::NAN), 0.0);
/// ```
pub fn bps_to_gbps(bits_per_second: f64) -> f64 {
    if !bits_per_second.is_finite() {
        return 0.0;
    }
    round_to(bits_per_second / BITS_PER_GBPS, THROUGHPUT_DECIMALS)
}

/// Convert a byte count to decimal GB with 2-decimal rounding
pub fn bytes_to_gb(bytes: f64) -> f64 {
    if !bytes.is_finite() {
        return 0.0;
    }
    round_to(bytes / BYTES_PER_GB, THROUGHPUT_DECIMALS)
}

/// Format a throughput for display
///
/// Selects the largest of Gbps, Mbps and Kbps for which the scaled value is
/// at least 1 (Kbps otherwise) and prints exactly two decimals.
///
/// ## Parameters
/// - `bits_per_second`: finite, non-negative rate; callers guarantee this
///
/// ## Returns
/// Human-readable rate string such as `"59.80 Gbps"`
///
/// ## Examples
///
/// ```rust
/// # use iperf_report::utils::format_throughput;
/// assert_eq!(format_throughput(1_500_000_000.0), "1.50 Gbps");
/// assert_eq!(format_throughput(940_000_000.0), "940.00 Mbps");
/// assert_eq!(format_throughput(500_000.0), "500.00 Kbps");
/// ```
pub fn format_throughput(bits_per_second: f64) -> String {
    let gbps = bits_per_second / BITS_PER_GBPS;
    if gbps >= 1.0 {
        return format!("{:.2} Gbps", gbps);
    }

    let mbps = bits_per_second / BITS_PER_MBPS;
    if mbps >= 1.0 {
        return format!("{:.2} Mbps", mbps);
    }

    format!("{:.2} Kbps", bits_per_second / BITS_PER_KBPS)
}

/// Format a byte count in decimal units (B, KB, MB, GB)
///
/// iperf3 reports transfer totals in bytes; decimal units keep the display
/// consistent with the decimal bit rates.
pub fn format_bytes(bytes: f64) -> String {
    if bytes < 1_000.0 {
        format!("{:.0} B", bytes)
    } else if bytes < 1_000_000.0 {
        format!("{:.2} KB", bytes / 1_000.0)
    } else if bytes < BYTES_PER_GB {
        format!("{:.2} MB", bytes / 1_000_000.0)
    } else {
        format!("{:.2} GB", bytes / BYTES_PER_GB)
    }
}

/// Format a CPU reading, keeping "not measured" visible
pub fn format_cpu(percent: Option<f64>) -> String {
    match percent {
        Some(p) => format!("{:.prec$}%", p, prec = CPU_DECIMALS as usize),
        None => "n/a".to_string(),
    }
}

/// Throughput series for a sparkline chart
///
/// Maps each retained interval's rate to Gbps (2-decimal rounding) in
/// chronological order. A test without intervals yields an empty series.
pub fn sparkline_data(metrics: &CanonicalTestMetrics) -> Vec<f64> {
    metrics
        .intervals
        .iter()
        .map(|interval| bps_to_gbps(interval.bits_per_second))
        .collect()
}

/// Peak throughput of a single test in bits per second
///
/// The highest interval rate, or the test's own average when it has no
/// intervals. A missing time series is not the same as a measured zero, so
/// the average stands in rather than 0.
pub fn peak_throughput(metrics: &CanonicalTestMetrics) -> f64 {
    metrics
        .max_interval_bits_per_second()
        .unwrap_or(metrics.avg_bits_per_second)
}

/// Render a series as a unicode sparkline
///
/// Values are scaled against the series maximum. Only the last `width`
/// points are drawn.
///
/// ## Examples
///
/// ```rust
/// # use iperf_report::utils::render_sparkline;
/// assert_eq!(render_sparkline(&[0.0, 4.0, 8.0], 10), "▁▅█");
/// assert_eq!(render_sparkline(&[], 10), "");
/// ```
pub fn render_sparkline(values: &[f64], width: usize) -> String {
    let visible = &values[values.len().saturating_sub(width)..];
    let max = visible.iter().cloned().fold(0.0, f64::max);

    visible
        .iter()
        .map(|&v| {
            if max <= 0.0 {
                return SPARK_LEVELS[0];
            }
            let level = ((v / max) * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}

/// Print a formatted table row
///
/// Outputs a row with consistent column widths, used by the CLI's table
/// view of per-test results.
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    print!("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        print!(" {:width$} |", column, width = width);
    }
    println!();
}

/// Print a table separator matching `print_table_row` widths
pub fn print_table_separator(widths: &[usize]) {
    print!("+");
    for &width in widths {
        print!("{}+", "-".repeat(width + 2));
    }
    println!();
}
