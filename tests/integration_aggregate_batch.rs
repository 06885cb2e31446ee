use anyhow::Result;
use iperf_report::{
    calculate_aggregate_metrics, calculate_aggregate_metrics_parallel,
    results::{load_test_record, source_label},
    ReportError, ReportWriter, TestRecord,
};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_all(names: &[&str]) -> Result<Vec<TestRecord>> {
    names
        .iter()
        .map(|name| Ok(load_test_record(&fixture(name))?))
        .collect()
}

/// Client, server and UDP runs of one exercise, plus two failures.
#[test]
fn mixed_batch_aggregate() -> Result<()> {
    let records = load_all(&[
        "tcp_client.json",
        "tcp_server.json",
        "udp_client.json",
        "aborted_client.json",
        "task_failed.json",
    ])?;

    let aggregate = calculate_aggregate_metrics(&records);

    assert_eq!(aggregate.total_tests, 5);
    assert_eq!(aggregate.successful_tests, 3);
    assert_eq!(aggregate.avg_duration_seconds, 2);
    assert_eq!(aggregate.total_streams, 4);
    assert_eq!(aggregate.avg_throughput_gbps, 23.07);
    assert_eq!(aggregate.peak_throughput_gbps, 59.79);
    assert_eq!(aggregate.avg_cpu_host, Some(23.9));
    assert_eq!(aggregate.avg_cpu_remote, Some(10.5));

    assert_eq!(calculate_aggregate_metrics_parallel(&records), aggregate);
    Ok(())
}

#[test]
fn failed_inputs_become_failed_records() -> Result<()> {
    let records = load_all(&["aborted_client.json", "task_failed.json"])?;

    assert!(records.iter().all(|r| !r.is_successful()));
    assert_eq!(records[0].source, "aborted_client.json");
    assert!(records[1]
        .error
        .as_deref()
        .unwrap()
        .contains("the server is busy running a test"));
    Ok(())
}

/// A test without intervals must not drag the peak towards zero.
#[test]
fn peak_survives_tests_without_intervals() {
    let with_intervals = iperf_report::parse_iperf_str(
        r#"{
            "intervals": [
                {"sum": {"start": 0.0, "end": 1.0, "seconds": 1.0, "bits_per_second": 4.0e9, "bytes": 500000000}},
                {"sum": {"start": 1.0, "end": 2.0, "seconds": 1.0, "bits_per_second": 5.0e9, "bytes": 625000000}}
            ],
            "end": {"sum_sent": {"seconds": 2.0, "bytes": 1125000000, "bits_per_second": 4.5e9}}
        }"#,
    )
    .unwrap();
    let without_intervals = iperf_report::parse_iperf_str(
        r#"{"end": {"sum_sent": {"seconds": 2.0, "bytes": 750000000, "bits_per_second": 3.0e9}}}"#,
    )
    .unwrap();

    let aggregate = calculate_aggregate_metrics(&[
        TestRecord::succeeded("a", with_intervals),
        TestRecord::succeeded("b", without_intervals),
    ]);

    assert_eq!(aggregate.peak_throughput_gbps, 5.0);
    assert_eq!(aggregate.avg_throughput_gbps, 3.75);
}

#[test]
fn missing_file_is_an_io_error() {
    let path = fixture("does_not_exist.json");
    let err = load_test_record(&path).unwrap_err();

    assert!(matches!(err, ReportError::Io { .. }));
    assert!(err.to_string().contains("does_not_exist.json"));
    assert_eq!(source_label(&path), "does_not_exist.json");
}

#[test]
fn report_file_contains_records_and_aggregate() -> Result<()> {
    let records = load_all(&["tcp_client.json", "aborted_client.json"])?;
    let aggregate = calculate_aggregate_metrics(&records);
    let output = NamedTempFile::new()?;

    ReportWriter::new(output.path()).write(&records, &aggregate)?;

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(output.path())?)?;
    assert_eq!(report["metadata"]["totalInputs"], 2);
    assert!(report["metadata"]["reportId"].as_str().unwrap().len() == 36);
    assert_eq!(report["tests"][0]["source"], "tcp_client.json");
    assert_eq!(report["tests"][0]["metrics"]["avgBitsPerSecond"], 59_800_000_000.0);
    assert!(report["tests"][1]["metrics"].is_null());
    assert_eq!(report["aggregate"]["totalTests"], 2);
    assert_eq!(report["aggregate"]["peakThroughputGbps"], 59.79);
    Ok(())
}
