// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the bridge.
//!
//! None of these escape a lifecycle callback: the controller logs them to the diagnostic
//! channel and carries on.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error::Error, fmt};
use thiserror::Error;

/// An error that occurred while writing an event to the sink.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[source] std::io::Error),

    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The event could not be serialized.
    #[error("error serializing event")]
    Serialize(#[source] serde_json::Error),
}

/// An error that occurred while parsing the bridge's configuration.
#[derive(Debug, Error)]
#[error("failed to parse event-bridge config{}", .config_file.as_ref().map(|file| format!(" at `{file}`")).unwrap_or_default())]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, err: ConfigError) -> Self {
        Self { config_file, err }
    }

    /// Returns the config file that failed to parse, if the failure was specific to one.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }
}

/// An error that occurred while initializing the diagnostic log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LogInitError {
    /// The log file could not be opened.
    #[error("error opening diagnostic log at {path}")]
    Open {
        /// The log file.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The log level directive could not be parsed.
    #[error("invalid log level directive `{input}`")]
    InvalidDirective {
        /// The directive as configured.
        input: String,

        /// The underlying parse error.
        #[source]
        error: tracing_subscriber::filter::ParseError,
    },

    /// A diagnostic log was already installed in this process.
    #[error("diagnostic log already initialized")]
    AlreadyInitialized,
}

/// Displays an error along with its chain of sources.
///
/// The first line is the error itself; each source follows on its own line.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new display wrapper.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let Some(mut cause) = self.error.source() else {
            return Ok(());
        };
        write!(f, "\n  caused by:")?;
        loop {
            write!(f, "\n  - {cause}")?;
            match cause.source() {
                Some(next) => cause = next,
                None => return Ok(()),
            }
        }
    }
}
