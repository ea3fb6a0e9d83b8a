// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{error, fmt, io};

/// An error that occurs while reading an event stream.
#[derive(Debug)]
pub enum ReadEventError {
    /// Reading from the underlying source failed.
    Io(io::Error),

    /// A complete line could not be parsed as an event record.
    Json {
        /// The 1-based line number within the stream.
        line_number: usize,

        /// The underlying parse error.
        error: serde_json::Error,
    },
}

impl fmt::Display for ReadEventError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(_) => write!(f, "error reading event stream"),
            Self::Json { line_number, .. } => {
                write!(f, "error parsing event record on line {line_number}")
            }
        }
    }
}

impl error::Error for ReadEventError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json { error, .. } => Some(error),
        }
    }
}
