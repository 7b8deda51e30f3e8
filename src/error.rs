//! Error types for the probing engine.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Job-level failures. Every variant aborts the run.
///
/// A timed-out attempt is not an error; it is a normal classification
/// carried by [`crate::types::ProbeStatus::Timeout`].
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("could not resolve {destination}: {source}")]
    Resolve {
        destination: String,
        #[source]
        source: io::Error,
    },

    #[error("{destination} resolved to no addresses")]
    NoAddress { destination: String },

    #[error("socket creation failed: {0}")]
    SocketCreate(#[source] io::Error),

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("cannot open output file {}: {source}", .path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker task failed: {0}")]
    WorkerPanicked(String),

    #[error("worker did not stop within {0:?} after cancellation")]
    WorkerStalled(Duration),
}

impl ProbeError {
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Numeric code reported to the caller alongside the message.
    ///
    /// The raw OS error is used when one exists; otherwise a fixed code per
    /// variant.
    pub fn code(&self) -> i32 {
        let os = match self {
            ProbeError::Resolve { source, .. }
            | ProbeError::SocketCreate(source)
            | ProbeError::Connect { source, .. }
            | ProbeError::FileIo { source, .. } => source.raw_os_error(),
            _ => None,
        };
        os.unwrap_or(match self {
            ProbeError::Resolve { .. } | ProbeError::NoAddress { .. } => 11001,
            ProbeError::SocketCreate(_) | ProbeError::Connect { .. } => 10038,
            ProbeError::FileIo { .. } => 5,
            ProbeError::InvalidConfig(_) => 87,
            ProbeError::WorkerPanicked(_) => 1,
            ProbeError::WorkerStalled(_) => 1460,
        })
    }

    /// Status reported for this error at the end of a job.
    pub fn status(&self) -> JobStatus {
        match self {
            ProbeError::Resolve { .. } | ProbeError::NoAddress { .. } => {
                JobStatus::ResolveError(self.code())
            }
            _ => JobStatus::SocketError(self.code()),
        }
    }
}

/// Exit status of a whole job as seen by the caller.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "status", content = "code", rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Cancelled,
    SocketError(i32),
    ResolveError(i32),
}

impl JobStatus {
    pub fn is_error(self) -> bool {
        matches!(self, JobStatus::SocketError(_) | JobStatus::ResolveError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_error_code_is_preferred() {
        let err = ProbeError::Connect {
            addr: "127.0.0.1:80".parse().unwrap(),
            source: io::Error::from_raw_os_error(111),
        };
        assert_eq!(err.code(), 111);
        assert_eq!(err.status(), JobStatus::SocketError(111));
    }

    #[test]
    fn resolution_failures_map_to_resolve_status() {
        let err = ProbeError::NoAddress {
            destination: "nowhere.invalid".into(),
        };
        assert_eq!(err.status(), JobStatus::ResolveError(11001));
        assert!(err.status().is_error());
        assert!(!JobStatus::Cancelled.is_error());
    }

    #[test]
    fn stalled_worker_is_not_reported_as_panic() {
        let err = ProbeError::WorkerStalled(Duration::from_secs(5));
        assert_eq!(err.to_string(), "worker did not stop within 5s after cancellation");
        assert_eq!(err.status(), JobStatus::SocketError(1460));
        assert!(!matches!(err, ProbeError::WorkerPanicked(_)));
    }

    #[test]
    fn messages_name_the_target() {
        let err = ProbeError::FileIo {
            path: PathBuf::from("/no/such/dir/out.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/no/such/dir/out.txt"));
    }
}
