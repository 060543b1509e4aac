//! Log output for turnstile processes.
//!
//! Every event the interposer and its demo emit carries an `event` field
//! naming what happened, taken from [`events`]. The `log_*!` macros attach
//! it so call sites only add their own fields.
//!
//! ```ignore
//! use turnstile_telemetry::{init_logging, LogFormat, LogSettings};
//!
//! init_logging(&LogSettings::new("debug", LogFormat::Pretty))?;
//! turnstile_telemetry::log_startup!(version = "0.1.0");
//! ```

pub mod events;
mod subscriber;

pub use subscriber::{init_logging, LogFormat, LogSettings};

#[doc(hidden)]
pub use tracing as __tracing;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("unknown log format {0:?} (expected json or pretty)")]
    UnknownFormat(String),

    #[error("invalid log level {level:?}: {source}")]
    InvalidLevel {
        level: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("failed to install the log subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}
