//! # docqa-telemetry
//!
//! Logging setup for the docqa binaries.
//!
//! - [`init_telemetry`] installs a `tracing-subscriber` fmt layer on stderr,
//!   filtered by `RUST_LOG` (default `info`), as human-readable or JSON lines.
//! - [`init_with_store`] additionally installs a [`QueryTraceLayer`] that
//!   records the spans of every question into a [`QueryTraceStore`], keyed by
//!   the `query_id` field of the `docqa.ask` span.
//!
//! ```rust,no_run
//! use docqa_telemetry::{LogFormat, init_telemetry};
//!
//! init_telemetry(LogFormat::Pretty).expect("logging already initialised");
//! tracing::info!("ready");
//! ```

pub mod memory;

#[cfg(test)]
mod test_memory;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt as fmt_layer};

pub use memory::{QueryTraceLayer, QueryTraceStore, SpanRecord};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines for terminals.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}', expected 'pretty' or 'json'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn fmt_layer_for(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Pretty => fmt_layer::layer().with_writer(std::io::stderr).with_target(false).boxed(),
        LogFormat::Json => fmt_layer::layer().json().with_writer(std::io::stderr).boxed(),
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already set.
pub fn init_telemetry(format: LogFormat) -> Result<(), TryInitError> {
    tracing_subscriber::registry().with(fmt_layer_for(format)).with(env_filter()).try_init()
}

/// Install the global subscriber with a [`QueryTraceLayer`] recording into `store`.
///
/// The trace layer sees every span regardless of `RUST_LOG`.
///
/// # Errors
///
/// Fails if a global subscriber is already set.
pub fn init_with_store(format: LogFormat, store: Arc<QueryTraceStore>) -> Result<(), TryInitError> {
    let fmt_layer = fmt_layer_for(format).with_filter(env_filter());
    tracing_subscriber::registry().with(fmt_layer).with(QueryTraceLayer::new(store)).try_init()
}
