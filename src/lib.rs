//! Library crate for tcping-rs: TCP reachability probing with RTT and
//! jitter statistics.
pub mod channel;
pub mod error;
pub mod job;
pub mod logging;
pub mod orchestrator;
pub mod probe;
pub mod resolve;
pub mod sink;
pub mod socket;
pub mod stats;
pub mod types;
pub mod worker;

pub use error::{JobStatus, ProbeError};
pub use job::{ProbeJob, ProbeJobConfig};
pub use orchestrator::{run, JobOutcome};
pub use stats::{Statistics, StatisticsSummary};
pub use types::{NotificationMessage, ProbeEvent, ProbeStatus};
