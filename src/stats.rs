//! Running RTT / jitter aggregation and the terminal summary record.

use serde::{Deserialize, Serialize};

/// Running counters, mutated only by the worker after each completed attempt.
///
/// Minimum and maximum values stay `None` until a sample exists, so a real
/// 0 ms sample is kept as a minimum instead of being read as "unset".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    sent: u64,
    successful: u64,
    failed: u64,
    min_rtt_ms: Option<f64>,
    max_rtt_ms: Option<f64>,
    total_rtt_ms: f64,
    min_jitter_ms: Option<f64>,
    max_jitter_ms: Option<f64>,
    total_jitter_ms: f64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn successful(&self) -> u64 {
        self.successful
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Average RTT over the successes recorded so far, 0 when there are none.
    pub fn running_avg_rtt_ms(&self) -> f64 {
        if self.successful > 0 {
            self.total_rtt_ms / self.successful as f64
        } else {
            0.0
        }
    }

    /// Record an open port and return the jitter computed for this sample.
    ///
    /// Jitter is the distance from the average of the *previous* successes,
    /// so the first success never yields one.
    pub fn record_open(&mut self, rtt_ms: f64, include_jitter: bool) -> Option<f64> {
        let jitter = if include_jitter && self.successful > 0 {
            Some((rtt_ms - self.running_avg_rtt_ms()).abs())
        } else {
            None
        };

        self.sent += 1;
        self.successful += 1;
        self.total_rtt_ms += rtt_ms;
        self.min_rtt_ms = Some(self.min_rtt_ms.map_or(rtt_ms, |m| m.min(rtt_ms)));
        self.max_rtt_ms = Some(self.max_rtt_ms.map_or(rtt_ms, |m| m.max(rtt_ms)));

        if let Some(j) = jitter {
            self.total_jitter_ms += j;
            self.min_jitter_ms = Some(self.min_jitter_ms.map_or(j, |m| m.min(j)));
            self.max_jitter_ms = Some(self.max_jitter_ms.map_or(j, |m| m.max(j)));
        }
        jitter
    }

    pub fn record_timeout(&mut self) {
        self.sent += 1;
        self.failed += 1;
    }

    /// Produce the terminal summary.
    pub fn finalize(&self) -> StatisticsSummary {
        let failed_percent = if self.sent > 0 {
            self.failed as f64 / self.sent as f64 * 100.0
        } else {
            0.0
        };
        // jitter samples exist only from the second success onward
        let avg_jitter_ms = if self.successful > 1 {
            self.total_jitter_ms / (self.successful - 1) as f64
        } else {
            0.0
        };
        StatisticsSummary {
            sent: self.sent,
            successful: self.successful,
            failed: self.failed,
            failed_percent,
            min_rtt_ms: self.min_rtt_ms,
            max_rtt_ms: self.max_rtt_ms,
            avg_rtt_ms: self.running_avg_rtt_ms(),
            total_rtt_ms: self.total_rtt_ms,
            min_jitter_ms: self.min_jitter_ms,
            max_jitter_ms: self.max_jitter_ms,
            avg_jitter_ms,
            total_jitter_ms: self.total_jitter_ms,
        }
    }
}

/// Final statistics of a run, emitted once by the orchestrator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct StatisticsSummary {
    pub sent: u64,
    pub successful: u64,
    pub failed: u64,
    pub failed_percent: f64,
    pub min_rtt_ms: Option<f64>,
    pub max_rtt_ms: Option<f64>,
    pub avg_rtt_ms: f64,
    pub total_rtt_ms: f64,
    pub min_jitter_ms: Option<f64>,
    pub max_jitter_ms: Option<f64>,
    pub avg_jitter_ms: f64,
    pub total_jitter_ms: f64,
}

impl StatisticsSummary {
    /// Human-readable summary paragraph used by text sinks.
    pub fn render(&self, target: &str, include_jitter: bool) -> String {
        let fmt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}ms"));
        let mut out = format!(
            "Probing statistics for {target}:\n    Attempted = {}, Connected = {}, Failed = {} ({:.2}% fail)\n",
            self.sent, self.successful, self.failed, self.failed_percent
        );
        out.push_str(&format!(
            "Approximate connection times:\n    Minimum = {}, Maximum = {}, Average = {:.2}ms\n",
            fmt(self.min_rtt_ms),
            fmt(self.max_rtt_ms),
            self.avg_rtt_ms
        ));
        if include_jitter {
            out.push_str(&format!(
                "Jitter:\n    Minimum = {}, Maximum = {}, Average = {:.2}ms\n",
                fmt(self.min_jitter_ms),
                fmt(self.max_jitter_ms),
                self.avg_jitter_ms
            ));
        }
        out
    }
}
