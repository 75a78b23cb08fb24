//! # Logging
//!
//! Structured logging for the library and the `fieldcap` binary, built on `tracing`
//! and `tracing-subscriber`. Events go to stderr so they never interleave with the
//! interactive prompts written to stdout.
//!
//! `RUST_LOG` overrides the verbosity chosen on the command line.
//!
//! ```no_run
//! use field_capture::logging::{self, LogFormat};
//!
//! logging::init(LogFormat::Compact, 1).unwrap();
//! tracing::info!(session = "store-17", "ready");
//! ```

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{EnvFilter, Layer, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{CaptureError, CaptureResult};

const ALREADY_SET: &str = "a global default trace dispatcher has already been set";

/// Output format for log events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored (development)
    Pretty,
    /// Single line per event
    #[default]
    Compact,
    /// One JSON object per event (log aggregation)
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        };
        f.write_str(name)
    }
}

impl FromStr for LogFormat {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(CaptureError::config(
                "log_format",
                other,
                "must be one of: pretty, compact, json",
            )),
        }
    }
}

/// Default filter directive for a `-v` count: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// Calling this more than once is harmless: an already-installed subscriber is
/// left in place, which keeps tests and embedding applications working.
pub fn init(format: LogFormat, verbosity: u8) -> CaptureResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

    let layer = match format {
        LogFormat::Pretty => tfmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => tfmt::layer()
            .compact()
            .with_target(false)
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => tfmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .or_else(|e| {
            if e.to_string().contains(ALREADY_SET) {
                Ok(())
            } else {
                Err(CaptureError::config("logging", format.to_string(), e.to_string()))
            }
        })
}
