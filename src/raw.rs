//! # Raw iperf3 Document Model
//!
//! Typed view of the JSON that `iperf3 --json` prints, in either its client
//! shape (transfer figures in `end.sum_sent`) or its server shape (figures in
//! `end.sum_received`). Every field is optional: iperf3 omits whole sections
//! depending on protocol, role and how far the run got before it stopped.
//!
//! ## Default Policy
//!
//! The accessors on these types are the single place where absent fields
//! resolve to defaults. Callers never reach into the `Option`s directly for
//! numeric values:
//!
//! | Field kind | Absent (or `null`) resolves to |
//! |---|---|
//! | byte / packet / retransmit counters | `0` |
//! | rates, timestamps, window lengths | `0.0` |
//! | sequences (`intervals`, `streams`, `connected`) | empty slice |
//! | whole summary block | [`RawSummary::EMPTY`] |
//!
//! A field with the wrong JSON type is treated as absent, so one bad value
//! costs that field rather than the whole document. Counters accept any
//! non-negative JSON number (`1.25e10` and `12500000000` are the same byte
//! count); negative or out-of-range counters are treated as absent.
//!
//! Fields whose absence carries meaning (CPU readings, UDP loss figures,
//! endpoint addresses) are left as `Option` and interpreted by the normalizer.
//!
//! Unknown fields are ignored, so documents from newer iperf3 releases load
//! without changes here.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Protocol string iperf3 writes into `start.test_start.protocol` for UDP runs
const UDP_PROTOCOL: &str = "UDP";

/// Complete iperf3 result document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTestResult {
    #[serde(deserialize_with = "lenient")]
    pub start: Option<RawStart>,
    #[serde(deserialize_with = "lenient")]
    pub intervals: Option<Vec<RawInterval>>,
    #[serde(deserialize_with = "lenient")]
    pub end: Option<RawEnd>,
    /// Set by iperf3 when the run aborted (e.g. "unable to connect to server")
    #[serde(deserialize_with = "lenient")]
    pub error: Option<String>,
}

/// The `start` section: negotiated test parameters and connection list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStart {
    #[serde(deserialize_with = "lenient")]
    pub test_start: Option<RawTestStart>,
    #[serde(deserialize_with = "lenient")]
    pub connecting_to: Option<RawConnectingTo>,
    #[serde(deserialize_with = "lenient")]
    pub connected: Option<Vec<RawConnection>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTestStart {
    #[serde(deserialize_with = "lenient")]
    pub protocol: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub num_streams: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub reverse: Option<u32>,
}

/// Target the client dialled (absent in server-side documents)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConnectingTo {
    #[serde(deserialize_with = "lenient")]
    pub host: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub port: Option<u16>,
}

/// One entry of `start.connected[]`, one per stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConnection {
    #[serde(deserialize_with = "lenient")]
    pub socket: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub local_host: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub local_port: Option<u16>,
    #[serde(deserialize_with = "lenient")]
    pub remote_host: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub remote_port: Option<u16>,
}

/// One reporting window of `intervals[]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInterval {
    #[serde(deserialize_with = "lenient")]
    pub sum: Option<RawSummary>,
    #[serde(deserialize_with = "lenient")]
    pub streams: Option<Vec<RawStreamSample>>,
}

/// Per-stream reading inside an interval
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStreamSample {
    #[serde(deserialize_with = "lenient")]
    pub socket: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub start: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub end: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub seconds: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub bytes: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub bits_per_second: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub retransmits: Option<u64>,
}

/// Summary block shared by interval sums and the `end` totals.
///
/// TCP documents fill `retransmits`; UDP documents fill the jitter and loss
/// fields. The two sets never appear together in practice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSummary {
    #[serde(deserialize_with = "lenient")]
    pub start: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub end: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub seconds: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub bytes: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub bits_per_second: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub retransmits: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub jitter_ms: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub lost_packets: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub packets: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub lost_percent: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub out_of_order: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub sender: Option<bool>,
}

/// The `end` section: whole-run totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEnd {
    #[serde(deserialize_with = "lenient")]
    pub sum_sent: Option<RawSummary>,
    #[serde(deserialize_with = "lenient")]
    pub sum_received: Option<RawSummary>,
    /// UDP runs report their totals here
    #[serde(deserialize_with = "lenient")]
    pub sum: Option<RawSummary>,
    #[serde(deserialize_with = "lenient")]
    pub cpu_utilization_percent: Option<RawCpuUtilization>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCpuUtilization {
    #[serde(deserialize_with = "lenient")]
    pub host_total: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub host_user: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub host_system: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub remote_total: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub remote_user: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub remote_system: Option<f64>,
}

/// Deserialize an optional field, treating a value of the wrong type as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    match Option::<T>::deserialize(value) {
        Ok(field) => Ok(field),
        Err(e) => {
            debug!("Ignoring ill-typed field: {}", e);
            Ok(None)
        }
    }
}

/// Deserialize an optional counter from any JSON number.
///
/// Whole numbers written in float notation are accepted; a fractional part
/// is truncated. Values that do not fit `T` are treated as absent.
fn lenient_count<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = Value::deserialize(deserializer)?;
    let count = match value {
        Value::Null => None,
        Value::Number(ref n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f as u64)
        }),
        _ => None,
    };
    if count.is_none() && !value.is_null() {
        debug!("Ignoring counter that is not a non-negative number: {}", value);
    }
    Ok(count.and_then(|c| T::try_from(c).ok()))
}

impl RawTestResult {
    /// True only when iperf3 declared the run as UDP; anything else is TCP
    pub fn is_udp(&self) -> bool {
        self.test_start().and_then(|t| t.protocol.as_deref()) == Some(UDP_PROTOCOL)
    }

    pub fn test_start(&self) -> Option<&RawTestStart> {
        self.start.as_ref().and_then(|s| s.test_start.as_ref())
    }

    pub fn connecting_to(&self) -> Option<&RawConnectingTo> {
        self.start.as_ref().and_then(|s| s.connecting_to.as_ref())
    }

    pub fn connected(&self) -> &[RawConnection] {
        self.start
            .as_ref()
            .and_then(|s| s.connected.as_deref())
            .unwrap_or(&[])
    }

    pub fn intervals(&self) -> &[RawInterval] {
        self.intervals.as_deref().unwrap_or(&[])
    }
}

impl RawInterval {
    /// The interval-level aggregate, or an all-defaults block
    pub fn sum(&self) -> &RawSummary {
        self.sum.as_ref().unwrap_or(&RawSummary::EMPTY)
    }

    pub fn streams(&self) -> &[RawStreamSample] {
        self.streams.as_deref().unwrap_or(&[])
    }
}

impl RawStreamSample {
    /// Socket descriptor, reused as a stable stream id
    pub fn socket(&self) -> i64 {
        self.socket.unwrap_or(0)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.unwrap_or(0)
    }

    pub fn bits_per_second(&self) -> f64 {
        self.bits_per_second.unwrap_or(0.0)
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits.unwrap_or(0)
    }
}

impl RawSummary {
    /// Summary block with every field absent
    pub const EMPTY: RawSummary = RawSummary {
        start: None,
        end: None,
        seconds: None,
        bytes: None,
        bits_per_second: None,
        retransmits: None,
        jitter_ms: None,
        lost_packets: None,
        packets: None,
        lost_percent: None,
        out_of_order: None,
        sender: None,
    };

    pub fn start(&self) -> f64 {
        self.start.unwrap_or(0.0)
    }

    pub fn end(&self) -> f64 {
        self.end.unwrap_or(0.0)
    }

    pub fn seconds(&self) -> f64 {
        self.seconds.unwrap_or(0.0)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.unwrap_or(0)
    }

    pub fn bits_per_second(&self) -> f64 {
        self.bits_per_second.unwrap_or(0.0)
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits.unwrap_or(0)
    }

    /// Whether both window bounds were reported
    pub fn has_bounds(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Whether this side actually measured a transfer.
    ///
    /// In a client/server pair only the measuring side reports nonzero bytes
    /// in its own block; the other block is present but zeroed.
    pub fn has_transfer(&self) -> bool {
        self.bytes() > 0
    }
}
