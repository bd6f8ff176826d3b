//! Logging setup for the calibration binaries.
//!
//! Records are tagged with the pipeline stage that emitted them (see
//! [`STAGES`]) and each stage can be raised to `debug` on its own, so a
//! failing solve can be inspected without the clustering chatter.
//!
//! [`init_with_stages`] installs a small stderr logger printing
//! `[elapsed LEVEL stage] message`. With the `tracing` feature,
//! [`init_tracing`] installs a `tracing-subscriber` registry with the same
//! per-stage directives on top of `RUST_LOG`.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

/// Pipeline stages and the module path prefix that logs for each.
pub const STAGES: &[(&str, &str)] = &[
    ("cluster", "court_calib_lines::cluster"),
    ("identify", "court_calib_lines::identify"),
    ("keypoints", "court_calib_camera::homography"),
    ("solve", "court_calib_camera::solver"),
    ("pipeline", "court_calib::pipeline"),
    ("io", "court_calib::io"),
];

/// Stage names accepted by [`init_with_stages`] and [`init_tracing`].
pub const STAGE_NAMES: &[&str] = &["cluster", "identify", "keypoints", "solve", "pipeline", "io"];

/// Stage name for a `log` target, or the last path segment for targets
/// outside the pipeline.
pub fn stage_of(target: &str) -> &str {
    STAGES
        .iter()
        .find(|(_, prefix)| target.starts_with(prefix))
        .map(|(stage, _)| *stage)
        .unwrap_or_else(|| target.rsplit("::").next().unwrap_or(target))
}

/// Module path prefix logging for a named stage.
pub fn stage_target(stage: &str) -> Option<&'static str> {
    STAGES
        .iter()
        .find(|(name, _)| *name == stage)
        .map(|(_, prefix)| *prefix)
}

struct StageLogger {
    level: LevelFilter,
    debug_stages: Vec<&'static str>,
    started: Instant,
}

impl StageLogger {
    fn new(level: LevelFilter, debug_stages: &[&str]) -> Self {
        let debug_stages = STAGE_NAMES
            .iter()
            .copied()
            .filter(|name| debug_stages.contains(name))
            .collect();
        Self {
            level,
            debug_stages,
            started: Instant::now(),
        }
    }

    fn max_level(&self) -> LevelFilter {
        if self.debug_stages.is_empty() {
            self.level
        } else {
            self.level.max(LevelFilter::Debug)
        }
    }

    fn level_for(&self, stage: &str) -> LevelFilter {
        if self.debug_stages.iter().any(|s| *s == stage) {
            self.level.max(LevelFilter::Debug)
        } else {
            self.level
        }
    }
}

impl Log for StageLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level_for(stage_of(metadata.target()))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            stage_of(record.target()),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<StageLogger> = OnceLock::new();

/// Install the stderr logger at `level` for every stage.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    init_with_stages(level, &[])
}

/// Install the stderr logger at `level`, with the named stages raised to
/// `debug`. Unknown stage names are ignored.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_stages(level: LevelFilter, debug_stages: &[&str]) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StageLogger::new(level, debug_stages));
        log::set_logger(logger)?;
        log::set_max_level(logger.max_level());
    }
    Ok(())
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`),
/// with `<stage target>=debug` directives added for `debug_stages`.
///
/// Span close events are reported so per-stage timings show up in the output.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, debug_stages: &[&str]) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for target in debug_stages.iter().filter_map(|s| stage_target(s)) {
        if let Ok(directive) = format!("{target}=debug").parse() {
            filter = filter.add_directive(directive);
        }
    }

    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer().with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        registry.with(layer.json().flatten_event(true)).try_init()
    } else {
        registry
            .with(layer.with_timer(fmt::time::Uptime::default()))
            .try_init()
    };
}
