//! Stderr logging for the recognition pipeline.
//!
//! Records from the `goban_*` crates are printed at the requested level as
//! `[elapsed LEVEL stage] message`, where `stage` is the crate name without
//! its prefix (`stones`, `lattice`, `board`). Records from other crates are
//! kept at `warn` so dependency chatter stays out of the stage trace.
//! Library crates only emit through the `log` macros; an application
//! installs one of the loggers once at startup.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable read by [`init_from_env`].
pub const LOG_ENV: &str = "GOBAN_LOG";

const CRATE_PREFIX: &str = "goban_";

/// Level applied to records that do not come from a pipeline crate.
const FOREIGN_LEVEL: LevelFilter = LevelFilter::Warn;

/// Pipeline stage named by a record target, if it is one of ours.
fn stage(target: &str) -> Option<&str> {
    let krate = target.split("::").next().unwrap_or(target);
    krate.strip_prefix(CRATE_PREFIX)
}

struct PipelineLogger {
    level: LevelFilter,
    started: Instant,
}

impl PipelineLogger {
    fn allows(&self, level: Level, target: &str) -> bool {
        let limit = if stage(target).is_some() {
            self.level
        } else {
            self.level.min(FOREIGN_LEVEL)
        };
        level <= limit
    }
}

impl Log for PipelineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.allows(metadata.level(), metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let label = stage(record.target()).unwrap_or(record.target());
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            label,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<PipelineLogger> = OnceLock::new();

/// Install the stderr logger with the provided level for pipeline records.
///
/// Only the first successful call installs a logger; later calls return
/// `Ok(())` and keep the original level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| PipelineLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Level named by `value` (`off`, `error` .. `trace`, any case), or `fallback`.
pub fn parse_level(value: Option<&str>, fallback: LevelFilter) -> LevelFilter {
    value
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(fallback)
}

/// Install the stderr logger at the level named by `GOBAN_LOG`, `info`
/// when unset or unreadable.
pub fn init_from_env() -> Result<(), log::SetLoggerError> {
    let value = std::env::var(LOG_ENV).ok();
    init_with_level(parse_level(value.as_deref(), LevelFilter::Info))
}

/// Install a `tracing` subscriber for the instrumented pipeline stages.
///
/// `RUST_LOG` overrides the default filter, which shows the `goban_*`
/// crates at `info` and everything else at `warn`. Span close events carry
/// timings, so each instrumented stage reports its duration.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives()));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(feature = "tracing")]
fn default_directives() -> String {
    ["core", "stones", "lattice", "board", "scan"]
        .iter()
        .fold(String::from("warn"), |mut acc, stage| {
            acc.push_str(&format!(",{CRATE_PREFIX}{stage}=info"));
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger(level: LevelFilter) -> PipelineLogger {
        PipelineLogger {
            level,
            started: Instant::now(),
        }
    }

    #[test]
    fn stage_strips_the_crate_prefix() {
        assert_eq!(stage("goban_lattice::fitter"), Some("lattice"));
        assert_eq!(stage("goban_board"), Some("board"));
        assert_eq!(stage("kiddo::float"), None);
    }

    #[test]
    fn foreign_records_stop_at_warn() {
        let l = logger(LevelFilter::Debug);
        assert!(l.allows(Level::Debug, "goban_stones::blob"));
        assert!(!l.allows(Level::Trace, "goban_stones::blob"));
        assert!(l.allows(Level::Warn, "rayon_core"));
        assert!(!l.allows(Level::Info, "rayon_core"));

        let quiet = logger(LevelFilter::Error);
        assert!(!quiet.allows(Level::Warn, "rayon_core"));
        assert!(!quiet.allows(Level::Info, "goban_board"));
    }

    #[test]
    fn level_names_parse_with_fallback() {
        assert_eq!(parse_level(Some("debug"), LevelFilter::Info), LevelFilter::Debug);
        assert_eq!(parse_level(Some(" WARN "), LevelFilter::Info), LevelFilter::Warn);
        assert_eq!(parse_level(Some("off"), LevelFilter::Info), LevelFilter::Off);
        assert_eq!(parse_level(Some("loud"), LevelFilter::Info), LevelFilter::Info);
        assert_eq!(parse_level(None, LevelFilter::Error), LevelFilter::Error);
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn tracing_filter_names_every_crate() {
        let d = default_directives();
        assert!(d.starts_with("warn,"));
        assert!(d.contains("goban_lattice=info"));
        assert!(d.contains("goban_scan=info"));
    }
}
