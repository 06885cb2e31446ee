use iperf_report::{parse_iperf_str, utils, Protocol, RawTestResult};

const TCP_CLIENT: &str = include_str!("fixtures/tcp_client.json");
const TCP_SERVER: &str = include_str!("fixtures/tcp_server.json");
const UDP_CLIENT: &str = include_str!("fixtures/udp_client.json");
const ABORTED_CLIENT: &str = include_str!("fixtures/aborted_client.json");

/// A client-side TCP document reports its transfer in `sum_sent`.
#[test]
fn tcp_client_document() {
    let m = parse_iperf_str(TCP_CLIENT).expect("client run completed");

    assert_eq!(m.protocol, Protocol::Tcp);
    assert_eq!(m.avg_bits_per_second, 59_800_000_000.0);
    assert_eq!(m.avg_bytes_transferred, 22_929_473_536);
    assert_eq!(m.duration_seconds, 3.041201);
    assert_eq!(m.stream_count, 2);
    assert_eq!(m.local_host.as_deref(), Some("10.10.0.12"));
    assert_eq!(m.local_port, Some(5201));
    assert_eq!(m.retransmits, 4);
    assert!(m.udp.is_none());
    assert_eq!(m.cpu_host, Some(48.61));
    assert_eq!(m.cpu_remote, Some(31.07));
    assert_eq!(utils::format_throughput(m.avg_bits_per_second), "59.80 Gbps");
}

/// The 41ms closing interval reports ~204 Gbps; it must not survive.
#[test]
fn tcp_client_drops_termination_interval() {
    let m = parse_iperf_str(TCP_CLIENT).unwrap();

    assert_eq!(m.intervals.len(), 3);
    let starts: Vec<f64> = m.intervals.iter().map(|i| i.start).collect();
    assert_eq!(starts, vec![0.0, 1.000041, 2.000037]);

    assert_eq!(utils::peak_throughput(&m), 59_792_139_770.0);
    assert_eq!(utils::sparkline_data(&m), vec![55.82, 59.79, 59.43]);

    let streams = &m.intervals[0].streams;
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].stream_id, 5);
    assert_eq!(streams[0].retransmits, 3);
    assert_eq!(streams[1].stream_id, 7);
    assert_eq!(streams[1].bytes, 3_497_000_960);
}

/// A server-side TCP document has a zeroed `sum_sent` and real figures in
/// `sum_received`.
#[test]
fn tcp_server_document_falls_back_to_sum_received() {
    let m = parse_iperf_str(TCP_SERVER).expect("server run completed");

    assert_eq!(m.protocol, Protocol::Tcp);
    assert_eq!(m.avg_bits_per_second, 9_416_400_000.0);
    assert_eq!(m.avg_bytes_transferred, 2_401_370_112);
    assert_eq!(m.duration_seconds, 2.040133);
    assert_eq!(m.stream_count, 1);
    // No connecting_to on the server side: the first connection is used
    assert_eq!(m.local_host.as_deref(), Some("10.10.0.12"));
    assert_eq!(m.local_port, Some(5201));
    assert_eq!(m.retransmits, 0);
    assert_eq!(m.cpu_host, Some(22.4));
    assert_eq!(m.cpu_remote, Some(0.0));
    assert_eq!(m.intervals.len(), 2);
    assert_eq!(utils::format_throughput(m.avg_bits_per_second), "9.42 Gbps");
}

#[test]
fn udp_document() {
    let m = parse_iperf_str(UDP_CLIENT).expect("udp run completed");

    assert_eq!(m.protocol, Protocol::Udp);
    assert_eq!(m.avg_bits_per_second, 1_025_077.4);
    assert_eq!(m.avg_bytes_transferred, 256_296);
    assert_eq!(m.duration_seconds, 2.000204);
    assert_eq!(m.retransmits, 0);

    let udp = m.udp.as_ref().expect("udp group");
    assert_eq!(udp.jitter_ms, Some(0.0214));
    assert_eq!(udp.lost_packets, Some(2));
    assert_eq!(udp.lost_percent, Some(1.1299));
    assert_eq!(udp.out_of_order, Some(1));

    assert_eq!(m.intervals.len(), 2);
    assert_eq!(utils::format_throughput(m.avg_bits_per_second), "1.03 Mbps");
}

#[test]
fn aborted_document_is_not_reportable() {
    assert!(parse_iperf_str(ABORTED_CLIENT).is_none());

    let raw: RawTestResult = serde_json::from_str(ABORTED_CLIENT).unwrap();
    assert!(raw.error.as_deref().unwrap().contains("unable to connect"));
    assert!(iperf_report::normalize(&raw).is_none());
}

/// Normalizing borrows the raw document and leaves it as it was.
#[test]
fn normalizing_does_not_touch_raw_document() {
    let raw: RawTestResult = serde_json::from_str(TCP_CLIENT).unwrap();
    let before = raw.clone();

    let _ = iperf_report::normalize(&raw);

    assert_eq!(raw, before);
    assert_eq!(raw.intervals().len(), 4);
}

#[test]
fn canonical_record_serializes_for_rendering() {
    let m = parse_iperf_str(UDP_CLIENT).unwrap();
    let json = serde_json::to_value(&m).unwrap();

    assert_eq!(json["protocol"], "UDP");
    assert_eq!(json["udp"]["jitterMs"], 0.0214);
    assert_eq!(json["udp"]["lostPackets"], 2);
    assert_eq!(json["localHost"], "10.10.0.12");
    assert_eq!(json["intervals"][1]["streams"][0]["streamId"], 5);
}
