//! Minimal stderr logger.
//!
//! Lines look like `[  1.234s  INFO orchestrator] message`: elapsed time since
//! installation, level, and the last segment of the record target. Install it
//! once with [`init_with_level`].
//!
//! Records from the `pano_hunter*` crates pass at the chosen level. Everything
//! else (HTTP stack, rustls) is held at `warn` or quieter.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Target prefix shared by every crate of the workspace.
const OWN_TARGET: &str = "pano_hunter";

/// `RUST_LOG` fallback for [`init_tracing`].
#[cfg(feature = "tracing")]
pub const DEFAULT_TRACING_FILTER: &str = "warn,pano_hunter=info";

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn new(level: LevelFilter) -> Self {
        Self {
            level,
            started: Instant::now(),
        }
    }

    fn limit_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_TARGET) {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        }
    }
}

fn short_target(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.limit_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger at `level` for the workspace crates.
///
/// Only the first call installs anything; later calls keep the first level.
/// Fails when another `log` implementation is already registered.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut fresh = false;
    let logger = LOGGER.get_or_init(|| {
        fresh = true;
        StderrLogger::new(level)
    });
    if fresh {
        log::set_logger(logger)?;
        log::set_max_level(logger.level);
    }
    Ok(())
}

/// Map a `-v` count to a level: 0 = info, 1 = debug, 2+ = trace.
pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install a `tracing` subscriber, filtered by `RUST_LOG` or
/// [`DEFAULT_TRACING_FILTER`]. Spans are reported when they close.
///
/// `log` records are forwarded through the subscriber's `tracing-log` bridge.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TRACING_FILTER));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    if json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.with_timer(fmt::time::Uptime::default()).try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_target_keeps_last_segment() {
        assert_eq!(short_target("pano_hunter_search::orchestrator"), "orchestrator");
        assert_eq!(short_target("main"), "main");
    }

    #[test]
    fn dependencies_stay_at_warn() {
        let logger = StderrLogger::new(LevelFilter::Trace);
        assert_eq!(logger.limit_for("pano_hunter_search::rate"), LevelFilter::Trace);
        assert_eq!(logger.limit_for("pano_hunter"), LevelFilter::Trace);
        assert_eq!(logger.limit_for("reqwest::connect"), LevelFilter::Warn);

        let quiet = StderrLogger::new(LevelFilter::Error);
        assert_eq!(quiet.limit_for("hyper_util"), LevelFilter::Error);
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_from_verbosity(0), LevelFilter::Info);
        assert_eq!(level_from_verbosity(1), LevelFilter::Debug);
        assert_eq!(level_from_verbosity(5), LevelFilter::Trace);
    }
}
