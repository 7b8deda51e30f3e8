use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};

use tcping_rs::job::{DEFAULT_COUNT, DEFAULT_INTERVAL_MS, DEFAULT_PORT, DEFAULT_TIMEOUT_MS};
use tcping_rs::sink::{ConsoleSink, JsonLinesSink, NotificationSink};
use tcping_rs::{logging, orchestrator, resolve, ProbeJob, ProbeJobConfig};

/// tcping-rs — probe a TCP port repeatedly and report connect time and jitter.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tcping-rs",
    version,
    about = "Probe a TCP port repeatedly and report connect time and jitter.",
    long_about = None
)]
struct Cli {
    /// Host name or IP address, optionally as host:port or [v6]:port.
    destination: String,

    /// TCP port (default 80, or the port given in the destination).
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of attempts.
    #[arg(short = 'n', long, default_value_t = DEFAULT_COUNT)]
    count: u32,

    /// Per-attempt timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Pause between attempts in milliseconds.
    #[arg(long = "interval-ms", default_value_t = DEFAULT_INTERVAL_MS)]
    interval_ms: u64,

    /// Stop after this many failed attempts (defaults to --count).
    #[arg(long = "fail-threshold")]
    fail_threshold: Option<u32>,

    /// Probe until interrupted with Ctrl+C.
    #[arg(short = 't', long, default_value_t = false)]
    continuous: bool,

    /// Compute jitter from the second successful attempt onward.
    #[arg(short = 'j', long, default_value_t = false)]
    jitter: bool,

    /// Show the reverse-DNS name of the resolved address.
    #[arg(long, default_value_t = false)]
    fqdn: bool,

    /// Send 4 bytes instead of a zero-length write to confirm the connection.
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Probe once and skip the summary.
    #[arg(short, long, default_value_t = false)]
    single: bool,

    /// Write results to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append to --output instead of truncating it.
    #[arg(long, requires = "output", default_value_t = false)]
    append: bool,

    /// Print each notification as one JSON line.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log level for diagnostics on stderr (RUST_LOG overrides).
    #[arg(long = "log-level", default_value = "warn")]
    log_level: LevelFilter,
}

impl Cli {
    fn to_config(&self) -> ProbeJobConfig {
        let (host, embedded_port) = resolve::parse_destination(&self.destination);
        ProbeJobConfig {
            destination: host,
            port: self.port.or(embedded_port).unwrap_or(DEFAULT_PORT),
            count: self.count,
            timeout_ms: self.timeout_ms,
            interval_ms: self.interval_ms,
            fail_threshold: self.fail_threshold.unwrap_or(self.count),
            continuous: self.continuous,
            include_jitter: self.jitter,
            print_fqdn: self.fqdn,
            force: self.force,
            single: self.single,
            output_file: self.output.clone(),
            append_to_file: self.append,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = cli.to_config();
    debug!(?config, "parsed configuration");

    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_ctrlc.cancel();
        }
    });

    let label = format!("{}:{}", config.destination, config.port);
    let include_jitter = config.include_jitter;
    let output = config.output_file.clone();

    let job = ProbeJob::new(config, cancel)
        .map_err(|e| anyhow::anyhow!("[{}] {e}", e.code()))
        .context("invalid probe job")?;

    let mut sink: Box<dyn NotificationSink> = if cli.json {
        Box::new(JsonLinesSink::new(io::stdout()))
    } else {
        Box::new(ConsoleSink::stdout(label.clone(), include_jitter))
    };

    let outcome = orchestrator::run(job, sink.as_mut())
        .await
        .map_err(|e| anyhow::anyhow!("[{}] {e}", e.code()))
        .with_context(|| format!("probing {label} failed"))?;

    if let Some(path) = output {
        println!("Wrote results to {}", path.display());
    }
    info!(status = ?outcome.status, "done");
    Ok(outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_port_is_used_without_flag() {
        let cli = Cli::parse_from(["tcping-rs", "example.test:8443"]);
        let c = cli.to_config();
        assert_eq!(c.destination, "example.test");
        assert_eq!(c.port, 8443);
        assert_eq!(c.fail_threshold, DEFAULT_COUNT);
    }

    #[test]
    fn port_flag_wins_and_threshold_follows_count() {
        let cli = Cli::parse_from(["tcping-rs", "example.test:8443", "-p", "22", "-n", "7"]);
        let c = cli.to_config();
        assert_eq!(c.port, 22);
        assert_eq!(c.fail_threshold, 7);
    }

    #[test]
    fn append_requires_output() {
        assert!(Cli::try_parse_from(["tcping-rs", "host", "--append"]).is_err());
        assert!(Cli::try_parse_from(["tcping-rs", "host", "--append", "-o", "out.txt"]).is_ok());
    }
}
