// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The diagnostic log.
//!
//! The bridge runs inside the host framework's process and must not write to its standard
//! output or error. Internal diagnostics go through `tracing` and, if a log file is configured,
//! are appended to that file. Otherwise they are discarded.

use crate::errors::LogInitError;
use camino::Utf8Path;
use chrono::{Local, SecondsFormat};
use std::{
    fmt,
    fs::{File, OpenOptions},
    io::Write,
    sync::{Mutex, Once},
};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

static INIT_LOGGER: Once = Once::new();

/// Installs the diagnostic log for this process, appending to `path`.
///
/// `level` is a target directive such as `warn` or `event_bridge=debug`; an empty directive
/// means `warn`. The log can be installed at most once per process.
pub fn init_diagnostic_log(path: &Utf8Path, level: &str) -> Result<(), LogInitError> {
    let targets = parse_targets(level)?;

    let mut res = Err(LogInitError::AlreadyInitialized);
    INIT_LOGGER.call_once(|| {
        res = install(path, targets);
    });
    res
}

/// Parses a level directive. An empty directive means `warn`.
pub fn parse_targets(level: &str) -> Result<Targets, LogInitError> {
    let level = level.trim();
    if level.is_empty() {
        return Ok(Targets::new().with_default(LevelFilter::WARN));
    }
    level
        .parse()
        .map_err(|error| LogInitError::InvalidDirective {
            input: level.to_owned(),
            error,
        })
}

fn install(path: &Utf8Path, targets: Targets) -> Result<(), LogInitError> {
    let open_error = |error| LogInitError::Open {
        path: path.to_owned(),
        error,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_error)?;
    write_header(&mut file).map_err(open_error)?;

    let layer = tracing_subscriber::fmt::layer()
        .event_format(SimpleFormatter)
        .with_writer(Mutex::new(file))
        .with_filter(targets);

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|_| LogInitError::AlreadyInitialized)
}

fn write_header(file: &mut File) -> std::io::Result<()> {
    let cwd = std::env::current_dir();
    let cwd = match &cwd {
        Ok(cwd) => cwd.display().to_string(),
        Err(_) => "(unknown)".to_owned(),
    };
    writeln!(
        file,
        "--- session started {} (pid {}, cwd {cwd})",
        Local::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        std::process::id(),
    )?;
    file.flush()
}

struct SimpleFormatter;

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let level = match *metadata.level() {
            Level::ERROR => "error",
            Level::WARN => "warning",
            Level::INFO => "info",
            Level::DEBUG => "debug",
            Level::TRACE => "trace",
        };
        write!(
            writer,
            "{} {level} [{}]: ",
            Local::now().format("%H:%M:%S%.3f"),
            metadata.target(),
        )?;

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            error: None,
        };
        event.record(&mut visitor);
        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

static MESSAGE_FIELD: &str = "message";

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let res = if field.name() == MESSAGE_FIELD {
            write!(self.writer, "{value:?}")
        } else {
            write!(self.writer, "; {} = {:?}", field.name(), value)
        };
        if let Err(error) = res {
            self.error = Some(error);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        // Strings are written without quotes, so multi-line errors stay readable.
        let res = if field.name() == MESSAGE_FIELD {
            write!(self.writer, "{value}")
        } else {
            write!(self.writer, "; {} = {value}", field.name())
        };
        if let Err(error) = res {
            self.error = Some(error);
        }
    }
}
