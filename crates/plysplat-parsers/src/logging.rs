//! Logging and tracing utilities for plysplat
//!
//! This module provides structured logging using the `tracing` crate,
//! with support for spans, events, and instrumentation.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the default tracing subscriber
///
/// This should be called once at application startup. Multiple calls are safe
/// and will be ignored.
pub fn init_default() {
    init_with_config(TracingConfig::default());
}

/// Initialize tracing with a custom configuration
///
/// Returns `false` if a subscriber was already installed.
pub fn init_with_config(config: TracingConfig) -> bool {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_err()
    {
        return false;
    }

    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .is_ok()
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default log level filter (e.g., "info", "debug", "warn")
    pub default_level: String,
    /// Show the target (module path) in log output
    pub show_target: bool,
    /// Show thread IDs in log output
    pub show_thread_ids: bool,
    /// Show source file in log output
    pub show_file: bool,
    /// Show line number in log output
    pub show_line_number: bool,
}

impl TracingConfig {
    /// Map a `-v` count onto a level and detail toggles
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        Self {
            default_level: level.to_string(),
            show_target: verbosity >= 2,
            show_thread_ids: verbosity >= 3,
            show_file: verbosity >= 3,
            show_line_number: verbosity >= 3,
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: "warn,plysplat=info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

/// Macros for common logging patterns
#[macro_export]
macro_rules! log_parse_start {
    ($parser:expr, $path:expr) => {
        tracing::info!(
            parser = %$parser,
            path = %$path.display(),
            "Starting parse"
        );
    };
}

#[macro_export]
macro_rules! log_parse_complete {
    ($parser:expr, $duration:expr, $items:expr) => {
        tracing::info!(
            parser = %$parser,
            duration_ms = %$duration.as_millis(),
            items = %$items,
            "Parse complete"
        );
    };
}

#[macro_export]
macro_rules! log_parse_error {
    ($parser:expr, $error:expr) => {
        tracing::error!(
            parser = %$parser,
            error = %$error,
            "Parse failed"
        );
    };
}

/// Instrument a parsing operation with timing
pub fn instrument_parse<T, F>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::info_span!("parse", parser = %name);
    let _guard = span.enter();

    let start = std::time::Instant::now();
    let result = f();
    let duration = start.elapsed();

    tracing::debug!(duration_ms = %duration.as_millis(), "Parse operation complete");

    result
}

/// Create a span for tracking progress through a large operation
pub fn progress_span(operation: &str, total: usize) -> tracing::Span {
    tracing::info_span!("progress", operation = %operation, total = %total)
}

/// Log progress within a progress span
pub fn log_progress(current: usize, total: usize) {
    if total > 0 && (current % 100_000 == 0 || current == total) {
        let percent = (current as f64 / total as f64 * 100.0) as u32;
        tracing::trace!(current = %current, total = %total, percent = %percent, "Progress");
    }
}
