//! Log setup for the `atril` binary: `tracing` to stderr, filtered by
//! verbosity unless `RUST_LOG` is set.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// 0 = warn, 1 (`-v`) = info, 2 (`-vv`) = debug, 3+ = trace.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Our crates log at `level`; dependencies stay at warn.
fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,atril={level},atril_cli={level},atril_core={level},\
             atril_ingest={level},atril_sync={level}"
        ))
    })
}

pub fn init_logging(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(level_for(verbosity)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
