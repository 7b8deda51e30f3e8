use serde::{Deserialize, Serialize};
use ::time::{format_description::well_known, OffsetDateTime};

use crate::stats::StatisticsSummary;

/// Classification of one probe attempt.
///
/// `Closed` exists for consumers that match on the full set of TCP outcomes,
/// but the probe loop never produces it: a refused connection keeps failing
/// the send check until the timeout elapses and is reported as `Timeout`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Open,
    Closed,
    Timeout,
}

impl ProbeStatus {
    pub fn describe(self) -> &'static str {
        match self {
            ProbeStatus::Open => "Port is open",
            ProbeStatus::Closed => "Port is closed",
            ProbeStatus::Timeout => "No response",
        }
    }
}

/// One record per attempt, produced by the probe and consumed once by a sink.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProbeEvent {
    pub timestamp: String,
    pub destination: String,
    pub address: String,
    pub port: u16,
    pub status: ProbeStatus,
    pub rtt_ms: f64,
    /// `None` when jitter was not computed for this attempt.
    pub jitter_ms: Option<f64>,
}

impl ProbeEvent {
    /// Jitter with the `-1` "not computed" convention used by text output.
    pub fn jitter_or_sentinel(&self) -> f64 {
        self.jitter_ms.unwrap_or(-1.0)
    }
}

/// Progress report for bounded runs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub activity: String,
    pub percent: u8,
}

/// Unit exchanged between the worker and the orchestrator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum NotificationMessage {
    Event(ProbeEvent),
    Statistics(StatisticsSummary),
    Warning(String),
    Information(String),
    Progress(ProgressRecord),
}

impl NotificationMessage {
    pub fn as_event(&self) -> Option<&ProbeEvent> {
        match self {
            NotificationMessage::Event(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_statistics(&self) -> Option<&StatisticsSummary> {
        match self {
            NotificationMessage::Statistics(s) => Some(s),
            _ => None,
        }
    }
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
