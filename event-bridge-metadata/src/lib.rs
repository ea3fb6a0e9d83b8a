// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the event stream written by `event-bridge`.
//!
//! The bridge appends one JSON record per line to an IPC file:
//!
//! ```json
//! {"eventType": "testCase", "payload": {...}, "timestamp": 1718000000.25}
//! ```
//!
//! This crate defines the records ([`EventRecord`], [`EventKind`] and the payload types) and an
//! [`EventReader`] that orchestrators can use to follow the stream, either after the fact or
//! while it is still being written.

mod errors;
mod events;
mod reader;

pub use errors::*;
pub use events::*;
pub use reader::*;
