//! Subscriber assembly for the two output formats.

use std::fmt;
use std::str::FromStr;

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::TelemetryError;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, event fields at the top level.
    #[default]
    Json,
    /// Multi-line human output with source locations.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else if s.eq_ignore_ascii_case("pretty") {
            Ok(Self::Pretty)
        } else {
            Err(TelemetryError::UnknownFormat(s.to_string()))
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        })
    }
}

/// The `--log-level`/`--log-format` pair a process starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directives. `RUST_LOG` replaces them when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self::new("info", LogFormat::Json)
    }
}

impl LogSettings {
    pub fn new(level: impl Into<String>, format: LogFormat) -> Self {
        Self {
            level: level.into(),
            format,
        }
    }

    fn filter(&self) -> Result<EnvFilter, TelemetryError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level).map_err(|source| TelemetryError::InvalidLevel {
            level: self.level.clone(),
            source,
        })
    }

    /// A filtered formatting layer writing to `writer`.
    pub fn layer<S, W>(&self, writer: W) -> Result<Box<dyn Layer<S> + Send + Sync>, TelemetryError>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let filter = self.filter()?;
        let layer = match self.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .flatten_event(true)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
        };
        Ok(layer)
    }
}

/// Install the process-wide subscriber, writing to stdout.
///
/// Fails if a subscriber is already installed or the level does not parse.
pub fn init_logging(settings: &LogSettings) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(settings.layer(std::io::stdout)?)
        .try_init()?;
    Ok(())
}
