//! Job configuration and per-run state.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{ProbeError, Result};

pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_COUNT: u32 = 4;
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;

/// Caller-supplied probing parameters.
///
/// Defaults are applied by the caller; the engine only validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeJobConfig {
    pub destination: String,
    pub port: u16,
    /// Attempts in bounded mode. Unused when `continuous` is set.
    pub count: u32,
    pub timeout_ms: u64,
    pub interval_ms: u64,
    /// Bounded runs stop once this many attempts have failed.
    pub fail_threshold: u32,
    pub continuous: bool,
    pub include_jitter: bool,
    pub print_fqdn: bool,
    /// Send a 4-byte payload instead of a zero-length write.
    pub force: bool,
    pub single: bool,
    pub output_file: Option<PathBuf>,
    pub append_to_file: bool,
}

impl Default for ProbeJobConfig {
    fn default() -> Self {
        Self {
            destination: String::new(),
            port: DEFAULT_PORT,
            count: DEFAULT_COUNT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
            fail_threshold: DEFAULT_COUNT,
            continuous: false,
            include_jitter: false,
            print_fqdn: false,
            force: false,
            single: false,
            output_file: None,
            append_to_file: false,
        }
    }
}

impl ProbeJobConfig {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Attempts the worker will make, `None` meaning "until cancelled".
    pub fn planned_attempts(&self) -> Option<u32> {
        if self.single {
            Some(1)
        } else if self.continuous {
            None
        } else {
            Some(self.count)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.destination.trim().is_empty() {
            return Err(ProbeError::invalid_config("destination is empty"));
        }
        if self.port == 0 {
            return Err(ProbeError::invalid_config("port must be in 1..=65535"));
        }
        if self.timeout_ms == 0 {
            return Err(ProbeError::invalid_config("timeout must be greater than zero"));
        }
        if !self.continuous && !self.single {
            if self.count == 0 {
                return Err(ProbeError::invalid_config("count must be greater than zero"));
            }
            if self.fail_threshold == 0 {
                return Err(ProbeError::invalid_config(
                    "failure threshold must be greater than zero",
                ));
            }
        }
        if self.append_to_file && self.output_file.is_none() {
            return Err(ProbeError::invalid_config(
                "append requested without an output file",
            ));
        }
        Ok(())
    }
}

/// A validated job plus the resources bound to this run.
#[derive(Debug)]
pub struct ProbeJob {
    pub config: ProbeJobConfig,
    pub cancel: CancellationToken,
    output: Option<File>,
}

impl ProbeJob {
    /// Validate the configuration and open the output file if one is set.
    ///
    /// File errors surface here, never mid-run.
    pub fn new(config: ProbeJobConfig, cancel: CancellationToken) -> Result<Self> {
        config.validate()?;
        let output = match &config.output_file {
            Some(path) => {
                let mut opts = OpenOptions::new();
                if config.append_to_file {
                    opts.append(true).create(true);
                } else {
                    opts.write(true).create(true).truncate(true);
                }
                let file = opts.open(path).map_err(|source| ProbeError::FileIo {
                    path: path.clone(),
                    source,
                })?;
                Some(file)
            }
            None => None,
        };
        Ok(Self {
            config,
            cancel,
            output,
        })
    }

    pub(crate) fn take_output(&mut self) -> Option<File> {
        self.output.take()
    }
}
