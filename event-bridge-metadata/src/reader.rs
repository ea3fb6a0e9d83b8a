// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{EventRecord, ReadEventError};
use std::io::BufRead;

/// Reads [`EventRecord`]s from a line-delimited event stream.
///
/// The producer appends whole lines, but a consumer following a live stream may observe a line
/// that is still being written. A trailing line without a newline is held back: the iterator
/// returns `None`, and once more data is available, calling `next` again resumes from where it
/// left off.
///
/// Blank lines are skipped.
#[derive(Debug)]
pub struct EventReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> EventReader<R> {
    /// Creates a new reader over the given source.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
        }
    }

    /// Returns the number of complete lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Returns true if an incomplete trailing line is being held back.
    pub fn has_partial_line(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Consumes the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<EventRecord, ReadEventError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // read_until appends, so a partial line from a previous call is completed in place.
            // Bytes are only decoded once the line is complete: a partial line may end in the
            // middle of a multi-byte character.
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(error) => return Some(Err(ReadEventError::Io(error))),
            }
            if !self.buf.ends_with(b"\n") {
                return None;
            }

            self.line_number += 1;
            let line = std::mem::take(&mut self.buf);
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            let line_number = self.line_number;
            return Some(
                serde_json::from_slice(line)
                    .map_err(|error| ReadEventError::Json { line_number, error }),
            );
        }
    }
}

/// Reads every complete record from the given source.
///
/// Stops at the first error.
pub fn read_events(reader: impl BufRead) -> Result<Vec<EventRecord>, ReadEventError> {
    EventReader::new(reader).collect()
}
