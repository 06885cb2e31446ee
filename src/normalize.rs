//! # Per-Test Normalizer
//!
//! Converts one iperf3 result document into [`CanonicalTestMetrics`].
//!
//! ## Summary Block Selection
//!
//! - **UDP**: totals come from `end.sum`.
//! - **TCP**: `end.sum_sent` when it carries bytes (client view), otherwise
//!   `end.sum_received` when it carries bytes (server view), otherwise an
//!   all-defaults block. Only the side that measured the transfer reports
//!   nonzero bytes in its own block.
//!
//! ## Fallback Chains
//!
//! - **Duration**: summary → `sum_sent` → `sum_received` → `sum` → 0; a zero
//!   reading falls through to the next candidate.
//! - **Stream count**: `test_start.num_streams` → `connected.len()` → 1.
//! - **Endpoint**: `connecting_to` → first `connected[]` entry, per field.
//! - **Retransmits** (TCP): first present of `sum_sent` / `sum_received`,
//!   else 0.
//!
//! A document without an `end` section did not finish and yields `None`.

use crate::{
    intervals::extract_intervals,
    metrics::{CanonicalTestMetrics, Protocol, UdpMetrics},
    raw::{RawEnd, RawSummary, RawTestResult},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Normalize a typed result document.
///
/// Returns `None` when the document has no `end` section.
pub fn normalize(result: &RawTestResult) -> Option<CanonicalTestMetrics> {
    let end = result.end.as_ref()?;

    if let Some(ref error) = result.error {
        warn!("iperf3 reported an error for a completed run: {}", error);
    }

    let protocol = if result.is_udp() {
        Protocol::Udp
    } else {
        Protocol::Tcp
    };
    let summary = select_summary(protocol, end);

    let (local_host, local_port) = resolve_endpoint(result);

    Some(CanonicalTestMetrics {
        protocol,
        duration_seconds: resolve_duration(summary, end),
        stream_count: resolve_stream_count(result),
        local_host,
        local_port,
        avg_bits_per_second: summary.bits_per_second(),
        avg_bytes_transferred: summary.bytes(),
        retransmits: match protocol {
            Protocol::Tcp => resolve_retransmits(end),
            Protocol::Udp => 0,
        },
        udp: match protocol {
            Protocol::Udp => Some(udp_metrics(end.sum.as_ref())),
            Protocol::Tcp => None,
        },
        cpu_host: end
            .cpu_utilization_percent
            .as_ref()
            .and_then(|cpu| cpu.host_total),
        cpu_remote: end
            .cpu_utilization_percent
            .as_ref()
            .and_then(|cpu| cpu.remote_total),
        intervals: extract_intervals(result.intervals()),
    })
}

/// Normalize a document that may not have been fetched.
///
/// An absent document yields `None`, the same as an unfinished one.
pub fn parse_iperf_result(result: Option<&RawTestResult>) -> Option<CanonicalTestMetrics> {
    result.and_then(normalize)
}

/// Normalize an untyped JSON document.
///
/// `null` and values that are not a document at all yield `None`. A field
/// with the wrong JSON type resolves to its default like a missing one;
/// malformed input is never an error here.
pub fn parse_iperf_value(value: &Value) -> Option<CanonicalTestMetrics> {
    if value.is_null() {
        return None;
    }

    match RawTestResult::deserialize(value) {
        Ok(raw) => normalize(&raw),
        Err(e) => {
            warn!("Ignoring malformed iperf3 document: {}", e);
            None
        }
    }
}

/// Normalize a JSON document given as text
pub fn parse_iperf_str(json: &str) -> Option<CanonicalTestMetrics> {
    match serde_json::from_str::<Value>(json) {
        Ok(value) => parse_iperf_value(&value),
        Err(e) => {
            warn!("Ignoring unparsable iperf3 output: {}", e);
            None
        }
    }
}

fn select_summary(protocol: Protocol, end: &RawEnd) -> &RawSummary {
    if protocol == Protocol::Udp {
        return end.sum.as_ref().unwrap_or(&RawSummary::EMPTY);
    }

    if let Some(sent) = end.sum_sent.as_ref().filter(|s| s.has_transfer()) {
        return sent;
    }

    if let Some(received) = end.sum_received.as_ref().filter(|s| s.has_transfer()) {
        debug!("sum_sent carries no bytes, using sum_received (server-side result)");
        return received;
    }

    debug!("Neither sum_sent nor sum_received carries bytes, using defaults");
    &RawSummary::EMPTY
}

fn resolve_duration(summary: &RawSummary, end: &RawEnd) -> f64 {
    [
        Some(summary),
        end.sum_sent.as_ref(),
        end.sum_received.as_ref(),
        end.sum.as_ref(),
    ]
    .into_iter()
    .flatten()
    .filter_map(|block| block.seconds)
    .find(|&seconds| seconds != 0.0)
    .unwrap_or(0.0)
}

fn resolve_stream_count(result: &RawTestResult) -> u32 {
    result
        .test_start()
        .and_then(|t| t.num_streams)
        .filter(|&n| n > 0)
        .or_else(|| match result.connected().len() {
            0 => None,
            n => u32::try_from(n).ok(),
        })
        .unwrap_or(1)
}

fn resolve_endpoint(result: &RawTestResult) -> (Option<String>, Option<u16>) {
    let target = result.connecting_to();
    let first = result.connected().first();

    let host = target
        .and_then(|t| t.host.clone())
        .filter(|h| !h.is_empty())
        .or_else(|| first.and_then(|c| c.local_host.clone()));
    let port = target
        .and_then(|t| t.port)
        .filter(|&p| p != 0)
        .or_else(|| first.and_then(|c| c.local_port));

    (host, port)
}

fn resolve_retransmits(end: &RawEnd) -> u64 {
    end.sum_sent
        .as_ref()
        .and_then(|s| s.retransmits)
        .or_else(|| end.sum_received.as_ref().and_then(|s| s.retransmits))
        .unwrap_or(0)
}

fn udp_metrics(sum: Option<&RawSummary>) -> UdpMetrics {
    match sum {
        Some(sum) => UdpMetrics {
            jitter_ms: sum.jitter_ms,
            lost_packets: sum.lost_packets,
            lost_percent: sum.lost_percent,
            out_of_order: sum.out_of_order,
        },
        None => UdpMetrics::default(),
    }
}
