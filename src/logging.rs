use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the stderr fmt subscriber. `RUST_LOG` takes precedence over
/// `level`. Calling this more than once is harmless.
pub fn init(level: LevelFilter) {
    let builder = EnvFilter::builder().with_default_directive(level.into());
    let filter = if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        builder.from_env_lossy()
    } else {
        builder.parse_lossy(default_directives(level))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolver crates are capped at `warn` unless debug output was asked for.
fn default_directives(level: LevelFilter) -> String {
    if level >= LevelFilter::DEBUG {
        level.to_string()
    } else {
        format!("{level},trust_dns_proto=warn,trust_dns_resolver=warn")
    }
}
