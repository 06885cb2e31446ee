//! # iperf-report - Main Entry Point
//!
//! Command-line shell around the normalization library. It plays the part of
//! the result-fetching and rendering collaborators: result documents come
//! from files, and the canonical records and aggregate go to the terminal
//! and, optionally, a JSON report.
//!
//! ## Flow
//!
//! 1. **Initialize logging**: tracing subscriber on stderr
//! 2. **Parse arguments**: clap derive `Args`
//! 3. **Load inputs**: read and normalize every file in parallel
//! 4. **Aggregate**: fold all records into summary statistics
//! 5. **Render**: table or JSON on stdout, report file if requested
//!
//! ## Error Handling
//!
//! Incomplete or failed tests are never errors; they become failed records
//! and count towards `totalTests`. Unreadable or syntactically invalid files
//! stop the run unless `--continue-on-error` is given, in which case they
//! are recorded as failed tests too.

use anyhow::Result;
use clap::Parser;
use colored::*;
use iperf_report::{
    cli::{Args, OutputFormat},
    defaults::SPARKLINE_WIDTH,
    logging,
    metrics::CanonicalTestMetrics,
    results::{
        calculate_aggregate_metrics_parallel, load_test_record, source_label, AggregateMetrics,
        ReportWriter, TestRecord,
    },
    utils::{
        format_bytes, format_cpu, format_throughput, peak_throughput, print_table_row,
        print_table_separator, render_sparkline, sparkline_data,
    },
};
use rayon::prelude::*;
use tracing::{error, info};

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG overrides --verbose, e.g. RUST_LOG=iperf_report=debug
    logging::init(args.verbose);

    info!("Loading {} result file(s)", args.inputs.len());

    let loaded: Vec<_> = args
        .inputs
        .par_iter()
        .map(|path| (path, load_test_record(path)))
        .collect();

    let mut records = Vec::with_capacity(loaded.len());
    for (path, outcome) in loaded {
        match outcome {
            Ok(record) => records.push(record),
            Err(e) => {
                error!("{}", e);
                if !args.continue_on_error {
                    return Err(e.into());
                }
                records.push(TestRecord::failed(source_label(path), e.to_string()));
            }
        }
    }

    let aggregate = calculate_aggregate_metrics_parallel(&records);

    match args.format {
        OutputFormat::Table => print_table(&records, &aggregate, args.sparkline),
        OutputFormat::Json => print_json(&records, &aggregate)?,
    }

    if let Some(ref output_file) = args.output_file {
        ReportWriter::new(output_file).write(&records, &aggregate)?;
    }

    info!(
        "{} of {} test(s) normalized",
        aggregate.successful_tests,
        records.len()
    );
    Ok(())
}

/// Print one row per test followed by the aggregate summary
fn print_table(records: &[TestRecord], aggregate: &AggregateMetrics, sparkline: bool) {
    let mut headers = vec![
        "Source", "Proto", "Duration", "Streams", "Avg", "Peak", "Transferred", "Retr/Lost",
        "CPU host", "CPU remote",
    ];
    let mut widths = vec![28, 5, 8, 7, 12, 12, 11, 9, 8, 10];
    if sparkline {
        headers.push("Intervals");
        widths.push(SPARKLINE_WIDTH);
    }

    print_table_separator(&widths);
    print_table_row(&headers, &widths);
    print_table_separator(&widths);

    for record in records {
        let row: Vec<String> = match record.metrics {
            Some(ref m) => {
                let mut row = vec![
                    record.source.clone(),
                    m.protocol.to_string(),
                    format!("{:.1}s", m.duration_seconds),
                    m.stream_count.to_string(),
                    format_throughput(m.avg_bits_per_second),
                    format_throughput(peak_throughput(m)),
                    format_bytes(m.avg_bytes_transferred as f64),
                    retransmits_cell(m),
                    format_cpu(m.cpu_host),
                    format_cpu(m.cpu_remote),
                ];
                if sparkline {
                    row.push(render_sparkline(&sparkline_data(m), SPARKLINE_WIDTH));
                }
                row
            }
            None => {
                let mut row = vec![record.source.clone(), "FAILED".to_string()];
                row.resize(headers.len(), String::new());
                row
            }
        };
        let columns: Vec<&str> = row.iter().map(String::as_str).collect();
        print_table_row(&columns, &widths);
    }
    print_table_separator(&widths);

    for record in records.iter().filter(|r| !r.is_successful()) {
        if let Some(ref reason) = record.error {
            println!("{} {}: {}", "failed".red(), record.source, reason);
        }
    }

    println!();
    println!("{}", "Summary".bold());
    println!(
        "  Tests:            {} successful of {}",
        aggregate.successful_tests, aggregate.total_tests
    );
    println!("  Avg duration:     {}s", aggregate.avg_duration_seconds);
    println!("  Total streams:    {}", aggregate.total_streams);
    println!("  Avg throughput:   {:.2} Gbps", aggregate.avg_throughput_gbps);
    println!("  Peak throughput:  {:.2} Gbps", aggregate.peak_throughput_gbps);
    println!("  Avg CPU host:     {}", format_cpu(aggregate.avg_cpu_host));
    println!("  Avg CPU remote:   {}", format_cpu(aggregate.avg_cpu_remote));
}

/// Retransmits for TCP, lost packets for UDP
fn retransmits_cell(metrics: &CanonicalTestMetrics) -> String {
    if metrics.is_udp() {
        match metrics.udp.as_ref().and_then(|udp| udp.lost_packets) {
            Some(lost) => format!("{} lost", lost),
            None => "-".to_string(),
        }
    } else {
        metrics.retransmits.to_string()
    }
}

fn print_json(records: &[TestRecord], aggregate: &AggregateMetrics) -> Result<()> {
    let output = serde_json::json!({
        "tests": records,
        "aggregate": aggregate,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
