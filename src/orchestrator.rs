//! Owns the worker task, forwards its notifications and emits the summary.

use std::time::Duration;

use serde::Serialize;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::channel::{notification_channel, Inbox};
use crate::error::{JobStatus, ProbeError, Result};
use crate::job::ProbeJob;
use crate::sink::{FileSink, NotificationSink};
use crate::stats::StatisticsSummary;
use crate::types::NotificationMessage;
use crate::worker::{self, WorkerExit};

const DRAIN_INTERVAL: Duration = Duration::from_millis(1);
/// Longest wait for the worker to return after cancellation.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Final state of a job as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub status: JobStatus,
    /// `None` in single-probe mode or when the run was cancelled before
    /// the destination was resolved.
    pub statistics: Option<StatisticsSummary>,
}

impl JobOutcome {
    /// Process exit code: 0 when every attempt connected, 1 when any
    /// failed, 130 when cancelled.
    pub fn exit_code(&self) -> u8 {
        match self.status {
            JobStatus::Cancelled => 130,
            JobStatus::SocketError(_) | JobStatus::ResolveError(_) => 2,
            JobStatus::Success => match &self.statistics {
                Some(s) if s.failed > 0 => 1,
                _ => 0,
            },
        }
    }
}

/// Run a job to completion or cancellation.
///
/// Messages go to the job's output file when one was opened, otherwise to
/// `host`. Job-level failures are returned as errors after every message
/// the worker produced has been delivered.
pub async fn run(mut job: ProbeJob, host: &mut dyn NotificationSink) -> Result<JobOutcome> {
    let config = job.config.clone();
    let cancel = job.cancel.clone();

    let mut file_sink = job.take_output().map(|file| {
        FileSink::file(
            file,
            format!("{}:{}", config.destination, config.port),
            config.include_jitter,
        )
    });
    let sink: &mut dyn NotificationSink = match file_sink.as_mut() {
        Some(f) => f,
        None => host,
    };

    let (notifier, mut inbox) = notification_channel();
    let mut handle = tokio::spawn(worker::run(config.clone(), notifier, cancel.clone()));
    info!(destination = %config.destination, port = config.port, "job started");

    let joined = loop {
        forward(&mut inbox, sink);

        if cancel.is_cancelled() {
            debug!("cancellation observed, waiting for worker");
            match time::timeout(STOP_GRACE, &mut handle).await {
                Ok(res) => break res,
                Err(_) => {
                    error!("worker did not stop within {:?}", STOP_GRACE);
                    forward(&mut inbox, sink);
                    return Err(ProbeError::WorkerStalled(STOP_GRACE));
                }
            }
        }

        tokio::select! {
            biased;
            res = &mut handle => break res,
            _ = cancel.cancelled() => {}
            _ = time::sleep(DRAIN_INTERVAL) => {}
        }
    };

    forward(&mut inbox, sink);

    let report = match joined {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            error!(error = %e, code = e.code(), "job aborted");
            return Err(e);
        }
        Err(join) => return Err(ProbeError::WorkerPanicked(join.to_string())),
    };

    let status = match report.exit {
        WorkerExit::Cancelled => JobStatus::Cancelled,
        WorkerExit::Completed | WorkerExit::ThresholdReached => JobStatus::Success,
    };

    let statistics = if config.single || report.target.is_none() {
        None
    } else {
        let summary = report.statistics.finalize();
        deliver(sink, &NotificationMessage::Statistics(summary.clone()));
        Some(summary)
    };

    info!(?status, sent = report.statistics.sent(), "job finished");
    Ok(JobOutcome { status, statistics })
}

fn forward(inbox: &mut Inbox, sink: &mut dyn NotificationSink) {
    for msg in inbox.try_drain() {
        deliver(sink, &msg);
    }
}

fn deliver(sink: &mut dyn NotificationSink, msg: &NotificationMessage) {
    if let Err(e) = sink.emit(msg) {
        warn!(error = %e, "sink rejected notification");
    }
}
