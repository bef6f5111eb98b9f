//! Tracing setup for the runtime.
//!
//! A [`LoggingBuilder`] turns a [`LoggingConfig`] (or programmatic calls)
//! into an installed `tracing-subscriber` stack: one fmt layer in the
//! configured format, an [`EnvFilter`] seeded from the configured level
//! plus per-module directives (`RUST_LOG` wins when set), and optional
//! file output through `tracing-appender`. Span events can be switched on
//! to follow a request through registration and hook dispatch.
//!
//! ```rust,ignore
//! use solder_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("solder_framework=debug")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// Which span lifecycle events the fmt layer writes.
///
/// Spans wrap registration and every hook invocation, so these flags
/// decide how chatty a dispatch trace is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanEvents {
    /// Span creation.
    pub new: bool,
    /// Span entry.
    pub enter: bool,
    /// Span exit.
    pub exit: bool,
    /// Span close.
    pub close: bool,
}

impl SpanEvents {
    /// No span events.
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Creation and close only. One line when a hook starts, one when it
    /// finishes, nothing in between.
    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    /// Every event. Loud, intended for debugging middleware chains.
    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    /// Enter and exit only.
    pub const ACTIVE: Self = Self {
        new: false,
        enter: true,
        exit: true,
        close: false,
    };

    fn to_fmt_span(self) -> FmtSpan {
        [
            (self.new, FmtSpan::NEW),
            (self.enter, FmtSpan::ENTER),
            (self.exit, FmtSpan::EXIT),
            (self.close, FmtSpan::CLOSE),
        ]
        .into_iter()
        .filter_map(|(wanted, flag)| wanted.then_some(flag))
        .fold(FmtSpan::NONE, |events, flag| events | flag)
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        Self {
            new: config.new,
            enter: config.enter,
            exit: config.exit,
            close: config.close,
        }
    }
}

/// Install a global subscriber described by `config`.
///
/// Does nothing if a subscriber is already installed, so tests and
/// embedders that set one up first are left alone.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Builder for the global tracing subscriber.
///
/// ```rust,ignore
/// use solder_runtime::logging::{LoggingBuilder, SpanEvents};
/// use tracing::Level;
///
/// LoggingBuilder::new()
///     .level(Level::DEBUG)
///     .span_events(SpanEvents::LIFECYCLE)
///     .show_thread_ids(true)
///     .init();
/// ```
pub struct LoggingBuilder {
    level: Option<tracing::Level>,
    directives: Vec<String>,
    format: LogFormat,
    output: LogOutput,
    span_events: SpanEvents,
    show_target: bool,
    show_thread_ids: bool,
    show_location: bool,
    file_path: Option<PathBuf>,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Compact stdout logging at the default level, targets shown.
    pub fn new() -> Self {
        LoggingBuilder {
            level: None,
            directives: Vec::new(),
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            span_events: SpanEvents::NONE,
            show_target: true,
            show_thread_ids: false,
            show_location: false,
            file_path: None,
        }
    }

    /// Builder pre-populated from a loaded [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        let directives = config
            .filters
            .iter()
            .map(|(module, level)| format!("{module}={level}"))
            .collect();
        LoggingBuilder {
            level: Some(config.level.to_tracing_level()),
            directives,
            format: config.format,
            output: config.output,
            span_events: SpanEvents::from(&config.span_events),
            show_target: true,
            show_thread_ids: config.thread_ids,
            show_location: config.file_location,
            file_path: config.file_path.clone(),
        }
    }

    /// Base level for everything without a more specific directive.
    pub fn level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Add one `target=level` filter directive.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    /// Select which span lifecycle events are written.
    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    /// Line format for the fmt layer.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Where log lines go.
    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Show the event's target (module path) on each line.
    pub fn show_target(mut self, enabled: bool) -> Self {
        self.show_target = enabled;
        self
    }

    /// Show the emitting thread's id on each line.
    pub fn show_thread_ids(mut self, enabled: bool) -> Self {
        self.show_thread_ids = enabled;
        self
    }

    /// Show source file and line number on each line.
    pub fn show_location(mut self, enabled: bool) -> Self {
        self.show_location = enabled;
        self
    }

    /// Log file path, used when the output is [`LogOutput::File`].
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Install the subscriber, ignoring a previously installed one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Install the subscriber.
    ///
    /// Fails when a global subscriber is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.env_filter();
        let writer = self.writer();
        let span_events = self.span_events.to_fmt_span();

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_span_events(span_events)
                .with_target(self.show_target)
                .with_thread_ids(self.show_thread_ids)
                .with_file(self.show_location)
                .with_line_number(self.show_location)
                .with_writer(writer)
                .boxed(),
            LogFormat::Full => fmt::layer()
                .with_span_events(span_events)
                .with_target(self.show_target)
                .with_thread_ids(self.show_thread_ids)
                .with_file(self.show_location)
                .with_line_number(self.show_location)
                .with_writer(writer)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_target(self.show_target)
                .with_thread_ids(self.show_thread_ids)
                .with_file(self.show_location)
                .with_line_number(self.show_location)
                .with_writer(writer)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_writer(writer)
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
    }

    /// `RUST_LOG` when present, otherwise the configured base level, with
    /// the builder's directives stacked on top.
    fn env_filter(&self) -> EnvFilter {
        let base = self
            .level
            .unwrap_or(tracing::Level::INFO)
            .to_string()
            .to_lowercase();
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));
        for directive in &self.directives {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                // The subscriber is not installed yet, so report on stderr.
                Err(err) => eprintln!("ignoring log directive {directive:?}: {err}"),
            }
        }
        filter
    }

    fn writer(&self) -> BoxMakeWriter {
        match self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File => match &self.file_path {
                Some(path) => {
                    let dir = path.parent().unwrap_or_else(|| Path::new("."));
                    let name = path.file_name().unwrap_or_else(|| OsStr::new("solder.log"));
                    BoxMakeWriter::new(tracing_appender::rolling::never(dir, name))
                }
                None => {
                    eprintln!("file log output configured without a path, using stdout");
                    BoxMakeWriter::new(std::io::stdout)
                }
            },
        }
    }
}
