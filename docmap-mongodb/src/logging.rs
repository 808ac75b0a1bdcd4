//! Logging setup for docmap.
//!
//! Everything in docmap logs through `tracing`. Cast diagnostics are emitted
//! at `warn`, translation steps and store calls at `debug`. Nothing is printed
//! until a subscriber is installed, either by the application or by [`init`].
//!
//! # Environment Variables
//!
//! - `DOCMAP_DEBUG=true|1|yes` - Enable debug logging
//! - `DOCMAP_LOG_LEVEL=trace|debug|info|warn|error` - Set the log level
//! - `DOCMAP_LOG_FORMAT=json|pretty|compact` - Set the output format (default: json)
//!
//! ```rust,no_run
//! use docmap_mongodb::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

use docmap_schema::config::DebugConfig;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "DOCMAP_DEBUG";
const LEVEL_VAR: &str = "DOCMAP_LOG_LEVEL";
const FORMAT_VAR: &str = "DOCMAP_LOG_FORMAT";

/// Check if debug logging is enabled via `DOCMAP_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn fallback_level() -> &'static str {
    if is_debug_enabled() { "debug" } else { "warn" }
}

/// Normalize a level name, `None` when it is not a level.
fn parse_level(level: &str) -> Option<&'static str> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// Normalize a format name, falling back to `json`.
fn parse_format(format: &str) -> &'static str {
    match format.trim().to_lowercase().as_str() {
        "pretty" => "pretty",
        "compact" => "compact",
        _ => "json",
    }
}

/// Log level from `DOCMAP_LOG_LEVEL`.
///
/// Defaults to `debug` when `DOCMAP_DEBUG` is set, `warn` otherwise.
pub fn get_log_level() -> &'static str {
    env::var(LEVEL_VAR)
        .ok()
        .and_then(|level| parse_level(&level))
        .unwrap_or_else(fallback_level)
}

/// Log format from `DOCMAP_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var(FORMAT_VAR)
        .map(|f| parse_format(&f))
        .unwrap_or("json")
}

/// Initialize logging from the environment.
///
/// Does nothing unless `DOCMAP_DEBUG` or `DOCMAP_LOG_LEVEL` is set.
/// Subsequent calls are no-ops.
pub fn init() {
    if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
        return;
    }
    install(get_log_level(), get_log_format());
}

/// Initialize logging from the `[debug]` section of `docmap.toml`.
///
/// Environment variables take precedence over the file.
pub fn init_from_config(config: &DebugConfig) {
    let level = env::var(LEVEL_VAR)
        .ok()
        .and_then(|level| parse_level(&level))
        .or_else(|| parse_level(&config.log_level))
        .unwrap_or_else(fallback_level);
    let format = env::var(FORMAT_VAR)
        .map(|f| parse_format(&f))
        .unwrap_or_else(|_| parse_format(&config.log_format));

    install(level, format);
}

fn install(level: &'static str, format: &'static str) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!(
                "docmap={level},docmap_schema={level},docmap_mongodb={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match format {
                "json" => registry.with(fmt::layer().json()).try_init(),
                "compact" => registry.with(fmt::layer().compact()).try_init(),
                _ => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level = level, format = format, "docmap logging initialized");
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        {
            let _ = (level, format);
        }
    });
}
