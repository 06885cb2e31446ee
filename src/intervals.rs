//! # Interval Extraction
//!
//! Turns the raw `intervals[]` time series into [`IntervalMetrics`], keeping
//! the input order and dropping windows that are too short to be a real
//! measurement.
//!
//! iperf3 closes every run with a trailing partial interval whose length is
//! whatever was left when the timer fired. Its throughput figure is an
//! artifact of termination timing and would otherwise dominate peak and
//! sparkline computations, so any window shorter than
//! [`MIN_INTERVAL_SECONDS`](crate::defaults::MIN_INTERVAL_SECONDS) is
//! discarded. The filter always runs.

use crate::{
    defaults::MIN_INTERVAL_SECONDS,
    metrics::{IntervalMetrics, StreamIntervalMetrics},
    raw::{RawInterval, RawStreamSample},
};
use tracing::debug;

/// Extract the retained intervals of a run, oldest first.
///
/// An interval missing either window bound has no measurable length and is
/// dropped. The raw slice is only borrowed; nothing in it is reordered or
/// changed.
pub fn extract_intervals(raw: &[RawInterval]) -> Vec<IntervalMetrics> {
    raw.iter()
        .filter(|interval| {
            let bounded = interval.sum().has_bounds();
            if !bounded {
                debug!("Dropping interval without start/end bounds");
            }
            bounded
        })
        .map(interval_metrics)
        .filter(|interval| {
            let keep = is_measurement_interval(interval);
            if !keep {
                debug!(
                    "Dropping short interval {:.3}-{:.3}s ({:.0} bits/s)",
                    interval.start, interval.end, interval.bits_per_second
                );
            }
            keep
        })
        .collect()
}

/// Whether an interval spans enough time to count as a measurement
pub fn is_measurement_interval(interval: &IntervalMetrics) -> bool {
    interval.window_seconds() >= MIN_INTERVAL_SECONDS
}

fn interval_metrics(raw: &RawInterval) -> IntervalMetrics {
    let sum = raw.sum();

    IntervalMetrics {
        start: sum.start(),
        end: sum.end(),
        seconds: sum.seconds(),
        bits_per_second: sum.bits_per_second(),
        bytes: sum.bytes(),
        retransmits: sum.retransmits(),
        streams: raw.streams().iter().map(stream_metrics).collect(),
    }
}

fn stream_metrics(raw: &RawStreamSample) -> StreamIntervalMetrics {
    StreamIntervalMetrics {
        stream_id: raw.socket(),
        bits_per_second: raw.bits_per_second(),
        bytes: raw.bytes(),
        retransmits: raw.retransmits(),
    }
}
