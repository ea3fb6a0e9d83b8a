// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capturing output written while tests run.
//!
//! The host adapter routes its standard output and error through a [`CaptureWriter`] for the
//! duration of test execution. Each write becomes a `groupStdout` or `groupStderr` event,
//! attributed to the group of the test that most recently started. Nothing is forwarded to the
//! real console.

use crate::{controller::SessionController, sink::EventSink};
use std::{fmt, io};

/// The stream a chunk of output was written to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// A writer that turns each write into an output event.
///
/// Bytes are converted to UTF-8 lossily, one write at a time. If the controller isn't active,
/// writes are swallowed. Writes always report every byte as written.
#[derive(Debug)]
pub struct CaptureWriter<'a, S: EventSink> {
    controller: &'a mut SessionController<S>,
    stream: OutputStream,
}

impl<S: EventSink> SessionController<S> {
    /// Returns a writer capturing output for `stream`.
    pub fn capture(&mut self, stream: OutputStream) -> CaptureWriter<'_, S> {
        CaptureWriter {
            controller: self,
            stream,
        }
    }
}

impl<S: EventSink> CaptureWriter<'_, S> {
    /// Returns the stream this writer captures.
    pub fn stream(&self) -> OutputStream {
        self.stream
    }
}

impl<S: EventSink> io::Write for CaptureWriter<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !buf.is_empty() {
            let chunk = String::from_utf8_lossy(buf).into_owned();
            self.controller.record_output(self.stream, chunk);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Every write is already flushed by the sink.
        Ok(())
    }
}
