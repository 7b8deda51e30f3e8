//! Attempt loop run on its own task.

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::Notifier;
use crate::error::Result;
use crate::job::ProbeJobConfig;
use crate::probe::{probe_once, AttemptOutcome, ProbeTarget};
use crate::resolve;
use crate::stats::Statistics;

/// Why the attempt loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Every planned attempt ran.
    Completed,
    /// Bounded run stopped early on the failure threshold.
    ThresholdReached,
    Cancelled,
}

/// What the worker hands back to the orchestrator when it returns.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub exit: WorkerExit,
    pub statistics: Statistics,
    pub target: Option<ProbeTarget>,
}

/// Resolve the destination, then probe until done, stopped or cancelled.
///
/// The worker is the only writer of its [`Statistics`]; they are returned
/// by value so the orchestrator reads them after the task has joined.
pub async fn run(
    config: ProbeJobConfig,
    notifier: Notifier,
    cancel: CancellationToken,
) -> Result<WorkerReport> {
    let mut statistics = Statistics::new();

    let resolved = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        r = resolve_target(&config, &notifier) => Some(r?),
    };
    let Some(target) = resolved else {
        return Ok(WorkerReport {
            exit: WorkerExit::Cancelled,
            statistics,
            target: None,
        });
    };

    notifier.info(format!(
        "Probing {} [{}] port {}/tcp",
        target.display,
        target.addr.ip(),
        target.addr.port()
    ));
    info!(target = %target.addr, display = %target.display, "probe run started");

    let planned = config.planned_attempts();
    let mut attempts = 0u64;
    let exit = loop {
        if let Some(total) = planned {
            notifier.progress(
                format!(
                    "Probing {}:{} - attempt {} of {}",
                    target.display,
                    target.addr.port(),
                    attempts + 1,
                    total
                ),
                progress_percent(attempts, total),
            );
        }

        if probe_once(&target, &config, &mut statistics, &notifier, &cancel).await?
            == AttemptOutcome::Cancelled
        {
            break WorkerExit::Cancelled;
        }
        attempts += 1;

        if let Some(total) = planned {
            if attempts >= u64::from(total) {
                break WorkerExit::Completed;
            }
            if !config.continuous && statistics.failed() >= config.fail_threshold as u64 {
                warn!(failed = statistics.failed(), "failure threshold reached");
                notifier.warn(format!(
                    "Stopping after {} failed attempts (threshold {})",
                    statistics.failed(),
                    config.fail_threshold
                ));
                break WorkerExit::ThresholdReached;
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break WorkerExit::Cancelled,
            _ = time::sleep(config.interval()) => {}
        }
    };

    debug!(?exit, sent = statistics.sent(), "probe run finished");
    Ok(WorkerReport {
        exit,
        statistics,
        target: Some(target),
    })
}

/// Share of the planned attempts already made, clamped to 100.
fn progress_percent(attempts: u64, total: u32) -> u8 {
    (attempts.saturating_mul(100) / u64::from(total.max(1))).min(100) as u8
}

async fn resolve_target(config: &ProbeJobConfig, notifier: &Notifier) -> Result<ProbeTarget> {
    let addr = resolve::resolve_first(&config.destination, config.port).await?;
    let (display, warning) = resolve::display_name(addr.ip(), config.print_fqdn).await;
    if let Some(w) = warning {
        notifier.warn(w);
    }
    Ok(ProbeTarget { addr, display })
}
