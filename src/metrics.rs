use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport protocol of a test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

/// Canonical, schema-stable metrics for one test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTestMetrics {
    pub protocol: Protocol,
    pub duration_seconds: f64,
    pub stream_count: u32,
    pub local_host: Option<String>,
    pub local_port: Option<u16>,
    pub avg_bits_per_second: f64,
    pub avg_bytes_transferred: u64,
    /// Always 0 for UDP runs
    pub retransmits: u64,
    /// Present for UDP runs only
    pub udp: Option<UdpMetrics>,
    /// `None` means "not measured", which is not the same as 0%
    pub cpu_host: Option<f64>,
    pub cpu_remote: Option<f64>,
    pub intervals: Vec<IntervalMetrics>,
}

/// Loss and jitter figures reported by UDP runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdpMetrics {
    pub jitter_ms: Option<f64>,
    pub lost_packets: Option<u64>,
    pub lost_percent: Option<f64>,
    pub out_of_order: Option<u64>,
}

/// One retained reporting window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalMetrics {
    pub start: f64,
    pub end: f64,
    pub seconds: f64,
    pub bits_per_second: f64,
    pub bytes: u64,
    pub retransmits: u64,
    pub streams: Vec<StreamIntervalMetrics>,
}

/// Per-stream reading within an interval
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamIntervalMetrics {
    pub stream_id: i64,
    pub bits_per_second: f64,
    pub bytes: u64,
    pub retransmits: u64,
}

impl CanonicalTestMetrics {
    /// UDP runs report loss figures instead of retransmits
    pub fn is_udp(&self) -> bool {
        self.protocol == Protocol::Udp
    }

    /// Highest interval throughput, or `None` when the run has no intervals
    pub fn max_interval_bits_per_second(&self) -> Option<f64> {
        self.intervals
            .iter()
            .map(|i| i.bits_per_second)
            .fold(None, |peak: Option<f64>, bps| {
                Some(peak.map_or(bps, |p| p.max(bps)))
            })
    }
}

impl IntervalMetrics {
    /// Length of the reporting window in seconds
    pub fn window_seconds(&self) -> f64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(start: f64, end: f64, bps: f64) -> IntervalMetrics {
        IntervalMetrics {
            start,
            end,
            seconds: end - start,
            bits_per_second: bps,
            ..IntervalMetrics::default()
        }
    }

    fn metrics(intervals: Vec<IntervalMetrics>) -> CanonicalTestMetrics {
        CanonicalTestMetrics {
            protocol: Protocol::Tcp,
            duration_seconds: 10.0,
            stream_count: 1,
            local_host: None,
            local_port: None,
            avg_bits_per_second: 1e9,
            avg_bytes_transferred: 1_250_000_000,
            retransmits: 0,
            udp: None,
            cpu_host: None,
            cpu_remote: None,
            intervals,
        }
    }

    #[test]
    fn test_protocol_display_and_serde() {
        assert_eq!(Protocol::Tcp.to_string(), "TCP");
        assert_eq!(Protocol::Udp.to_string(), "UDP");
        assert_eq!(serde_json::to_string(&Protocol::Udp).unwrap(), "\"UDP\"");
        assert_eq!(
            serde_json::from_str::<Protocol>("\"TCP\"").unwrap(),
            Protocol::Tcp
        );
    }

    #[test]
    fn test_is_udp() {
        let mut m = metrics(Vec::new());
        assert!(!m.is_udp());

        m.protocol = Protocol::Udp;
        assert!(m.is_udp());
    }

    #[test]
    fn test_max_interval_bits_per_second() {
        let m = metrics(vec![
            interval(0.0, 1.0, 2e9),
            interval(1.0, 2.0, 7e9),
            interval(2.0, 3.0, 4e9),
        ]);
        assert_eq!(m.max_interval_bits_per_second(), Some(7e9));
    }

    #[test]
    fn test_max_interval_is_none_without_intervals() {
        assert_eq!(metrics(Vec::new()).max_interval_bits_per_second(), None);
    }

    #[test]
    fn test_window_seconds() {
        assert_eq!(interval(9.0, 9.25, 0.0).window_seconds(), 0.25);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(metrics(vec![interval(0.0, 1.0, 1e9)])).unwrap();

        assert_eq!(json["avgBitsPerSecond"], 1e9);
        assert_eq!(json["durationSeconds"], 10.0);
        assert_eq!(json["streamCount"], 1);
        assert!(json["cpuHost"].is_null());
        assert!(json["udp"].is_null());
        assert_eq!(json["intervals"][0]["bitsPerSecond"], 1e9);
    }
}
