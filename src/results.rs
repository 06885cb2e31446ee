use crate::{
    defaults::{BITS_PER_GBPS, CPU_DECIMALS, THROUGHPUT_DECIMALS},
    error::ReportError,
    metrics::CanonicalTestMetrics,
    normalize::{normalize, parse_iperf_value},
    raw::RawTestResult,
    utils::round_to,
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Status string the agent reports for a completed task
const TASK_SUCCEEDED: &str = "succeeded";

/// One test as seen by the aggregator: a canonical record or a failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    /// Where the result came from (file name, task id)
    pub source: String,
    pub metrics: Option<CanonicalTestMetrics>,
    pub error: Option<String>,
}

/// Summary statistics across a batch of tests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetrics {
    pub total_tests: usize,
    pub successful_tests: usize,
    pub avg_duration_seconds: u64,
    pub total_streams: u64,
    pub avg_throughput_gbps: f64,
    pub peak_throughput_gbps: f64,
    /// `None` when no successful test measured CPU
    pub avg_cpu_host: Option<f64>,
    pub avg_cpu_remote: Option<f64>,
}

/// Running sums and counts behind [`AggregateMetrics`].
///
/// Every field combines with `+` or `max`, so a batch can be split into any
/// partitions, accumulated independently and merged. Means are only formed
/// in [`finish`](Self::finish), from the combined sums and counts.
#[derive(Debug, Clone, Default)]
pub struct AggregateAccumulator {
    total_tests: usize,
    successful_tests: usize,
    duration_sum: f64,
    stream_sum: u64,
    bits_per_second_sum: f64,
    /// Stays `None` until a test with intervals is seen
    peak_bits_per_second: Option<f64>,
    cpu_samples: usize,
    cpu_host_sum: f64,
    cpu_remote_sum: f64,
}

impl TestRecord {
    pub fn succeeded(source: impl Into<String>, metrics: CanonicalTestMetrics) -> Self {
        Self {
            source: source.into(),
            metrics: Some(metrics),
            error: None,
        }
    }

    pub fn failed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            metrics: None,
            error: Some(reason.into()),
        }
    }

    /// Normalize a typed document into a record
    pub fn from_raw(source: impl Into<String>, raw: &RawTestResult) -> Self {
        match normalize(raw) {
            Some(metrics) => Self::succeeded(source, metrics),
            None => Self::failed(source, "result has no end section"),
        }
    }

    /// Normalize an untyped document into a record
    pub fn from_value(source: impl Into<String>, value: &Value) -> Self {
        match parse_iperf_value(value) {
            Some(metrics) => Self::succeeded(source, metrics),
            None => Self::failed(source, "result is incomplete or malformed"),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.metrics.is_some()
    }
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one test into the running totals; `None` counts as a failed test
    pub fn add(&mut self, metrics: Option<&CanonicalTestMetrics>) {
        self.total_tests += 1;

        let metrics = match metrics {
            Some(m) => m,
            None => return,
        };

        self.successful_tests += 1;
        self.duration_sum += metrics.duration_seconds;
        self.stream_sum += u64::from(metrics.stream_count);
        self.bits_per_second_sum += metrics.avg_bits_per_second;

        // A test without intervals has no peak; it must not count as 0
        if let Some(peak) = metrics.max_interval_bits_per_second() {
            self.peak_bits_per_second = Some(max_option(self.peak_bits_per_second, peak));
        }

        if let Some(host) = metrics.cpu_host {
            self.cpu_samples += 1;
            self.cpu_host_sum += host;
            self.cpu_remote_sum += metrics.cpu_remote.unwrap_or(0.0);
        }
    }

    pub fn add_record(&mut self, record: &TestRecord) {
        self.add(record.metrics.as_ref());
    }

    /// Combine two partial accumulations
    pub fn merge(mut self, other: Self) -> Self {
        self.total_tests += other.total_tests;
        self.successful_tests += other.successful_tests;
        self.duration_sum += other.duration_sum;
        self.stream_sum += other.stream_sum;
        self.bits_per_second_sum += other.bits_per_second_sum;
        if let Some(peak) = other.peak_bits_per_second {
            self.peak_bits_per_second = Some(max_option(self.peak_bits_per_second, peak));
        }
        self.cpu_samples += other.cpu_samples;
        self.cpu_host_sum += other.cpu_host_sum;
        self.cpu_remote_sum += other.cpu_remote_sum;
        self
    }

    /// Produce the summary; a batch without successful tests yields the zero aggregate
    pub fn finish(&self) -> AggregateMetrics {
        if self.successful_tests == 0 {
            return AggregateMetrics::default();
        }

        let count = self.successful_tests as f64;
        let avg_bits_per_second = self.bits_per_second_sum / count;
        let peak_bits_per_second = self.peak_bits_per_second.unwrap_or(0.0);

        let (avg_cpu_host, avg_cpu_remote) = if self.cpu_samples > 0 {
            let samples = self.cpu_samples as f64;
            (
                Some(round_to(self.cpu_host_sum / samples, CPU_DECIMALS)),
                Some(round_to(self.cpu_remote_sum / samples, CPU_DECIMALS)),
            )
        } else {
            (None, None)
        };

        AggregateMetrics {
            total_tests: self.total_tests,
            successful_tests: self.successful_tests,
            avg_duration_seconds: (self.duration_sum / count).round() as u64,
            total_streams: self.stream_sum,
            avg_throughput_gbps: round_to(avg_bits_per_second / BITS_PER_GBPS, THROUGHPUT_DECIMALS),
            peak_throughput_gbps: round_to(peak_bits_per_second / BITS_PER_GBPS, THROUGHPUT_DECIMALS),
            avg_cpu_host,
            avg_cpu_remote,
        }
    }
}

fn max_option(current: Option<f64>, candidate: f64) -> f64 {
    current.map_or(candidate, |c| c.max(candidate))
}

/// Aggregate a batch of test records
pub fn calculate_aggregate_metrics(records: &[TestRecord]) -> AggregateMetrics {
    let mut accumulator = AggregateAccumulator::new();
    for record in records {
        accumulator.add_record(record);
    }
    accumulator.finish()
}

/// Aggregate a batch using rayon's fold/reduce over partitions
pub fn calculate_aggregate_metrics_parallel(records: &[TestRecord]) -> AggregateMetrics {
    records
        .par_iter()
        .fold(AggregateAccumulator::new, |mut accumulator, record| {
            accumulator.add_record(record);
            accumulator
        })
        .reduce(AggregateAccumulator::new, AggregateAccumulator::merge)
        .finish()
}

/// Task-result envelope the agent submits around iperf3 output
#[derive(Debug, Clone, Deserialize)]
struct TaskEnvelope {
    id: Option<u64>,
    status: String,
    result: Option<Value>,
    error: Option<String>,
    stderr: Option<String>,
}

impl TaskEnvelope {
    /// Recognize an envelope: a `status` string and no iperf3 sections
    fn detect(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if !object.get("status").map_or(false, Value::is_string)
            || object.contains_key("start")
            || object.contains_key("end")
        {
            return None;
        }
        TaskEnvelope::deserialize(value).ok()
    }

    fn into_record(self, source: String) -> TestRecord {
        let source = match self.id {
            Some(id) => format!("{} (task {})", source, id),
            None => source,
        };

        if self.status != TASK_SUCCEEDED {
            let reason = self
                .error
                .filter(|r| !r.trim().is_empty())
                .or(self.stderr.filter(|r| !r.trim().is_empty()))
                .unwrap_or_else(|| "no error reported".to_string());
            let error = ReportError::TaskFailed {
                source_label: source.clone(),
                status: self.status,
                reason: reason.trim().to_string(),
            };
            return TestRecord::failed(source, error.to_string());
        }

        TestRecord::from_value(source, self.result.as_ref().unwrap_or(&Value::Null))
    }
}

/// Build a record from a parsed JSON document, bare or enveloped
pub fn record_from_value(source: impl Into<String>, value: &Value) -> TestRecord {
    let source = source.into();
    match TaskEnvelope::detect(value) {
        Some(envelope) => {
            debug!("{} is a task envelope with status {}", source, envelope.status);
            envelope.into_record(source)
        }
        None => TestRecord::from_value(source, value),
    }
}

/// Load one result file into a record.
///
/// I/O and JSON syntax failures are errors; an incomplete or failed test is
/// a failed record.
pub fn load_test_record(path: &Path) -> Result<TestRecord, ReportError> {
    let text = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    let value: Value = serde_json::from_str(&text).map_err(|e| ReportError::json(path, e))?;

    let record = record_from_value(source_label(path), &value);
    if let Some(ref error) = record.error {
        warn!("{}: {}", record.source, error);
    }
    Ok(record)
}

/// Short label for a result file
pub fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Writes the consolidated JSON report
pub struct ReportWriter {
    output_file: PathBuf,
}

/// Report metadata
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub version: String,
    pub report_id: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub total_inputs: usize,
}

/// Final report structure
#[derive(Debug, Serialize)]
pub struct FinalReport<'a> {
    pub metadata: ReportMetadata,
    pub tests: &'a [TestRecord],
    pub aggregate: &'a AggregateMetrics,
}

impl ReportWriter {
    pub fn new(output_file: &Path) -> Self {
        Self {
            output_file: output_file.to_path_buf(),
        }
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    /// Write records and their aggregate as pretty JSON
    pub fn write(&self, records: &[TestRecord], aggregate: &AggregateMetrics) -> Result<()> {
        let report = FinalReport {
            metadata: ReportMetadata {
                version: crate::VERSION.to_string(),
                report_id: uuid::Uuid::new_v4().to_string(),
                generated_at: chrono::Utc::now(),
                total_inputs: records.len(),
            },
            tests: records,
            aggregate,
        };

        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&self.output_file, json)
            .with_context(|| format!("failed to write report to {}", self.output_file.display()))?;

        info!("Report written to: {:?}", self.output_file);
        Ok(())
    }
}
