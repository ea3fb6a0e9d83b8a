// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destinations for the event stream.
//!
//! The stream is newline-delimited JSON, one record per line. [`IpcSink`] appends each record
//! with a single write followed by a flush, so a reader following the file only ever observes
//! whole lines once the write returns.

use crate::errors::WriteEventError;
use camino::{Utf8Path, Utf8PathBuf};
use event_bridge_metadata::EventRecord;
use std::{
    fs::{File, OpenOptions},
    io::Write,
};

/// A destination for event records.
pub trait EventSink {
    /// Writes a single record. Records must be persisted in the order they are written.
    fn write_event(&mut self, record: &EventRecord) -> Result<(), WriteEventError>;
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn write_event(&mut self, record: &EventRecord) -> Result<(), WriteEventError> {
        (**self).write_event(record)
    }
}

/// Collects records in memory.
impl EventSink for Vec<EventRecord> {
    fn write_event(&mut self, record: &EventRecord) -> Result<(), WriteEventError> {
        self.push(record.clone());
        Ok(())
    }
}

/// Appends records to a file as JSON Lines.
///
/// The file is opened in append mode for every record, creating it if it doesn't exist. It is
/// never truncated: several short-lived sessions may append to the same stream, and a stream
/// that is removed or replaced between records is recreated at the same path.
#[derive(Debug)]
pub struct IpcSink {
    path: Utf8PathBuf,
}

impl IpcSink {
    /// Creates a sink for the given path. Nothing is opened until the first write.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path events are written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn open(&self) -> Result<File, WriteEventError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|error| WriteEventError::Fs {
                file: self.path.clone(),
                error,
            })
    }
}

impl EventSink for IpcSink {
    fn write_event(&mut self, record: &EventRecord) -> Result<(), WriteEventError> {
        let line = record.to_json_line().map_err(WriteEventError::Serialize)?;

        let mut file = self.open()?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(WriteEventError::Io)
    }
}
