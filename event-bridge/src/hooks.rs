// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data handed to the bridge by the host test framework.
//!
//! The host adapter translates its framework's native objects into these types and calls the
//! corresponding [`LifecycleHooks`] method. Nothing here retains framework objects.

use event_bridge_metadata::TestPhase;
use std::time::Duration;

/// A test item that is about to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestItem {
    /// The qualified identifier, e.g. `tests/test_math.py::TestMath::test_add`.
    pub node_id: String,
}

impl TestItem {
    /// Creates a new test item.
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }
}

/// The raw outcome flag of a single phase report.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The phase passed.
    Passed,
    /// The phase failed.
    Failed,
    /// The phase was skipped.
    Skipped,
    /// The framework reported something else.
    Other,
}

impl ReportOutcome {
    /// Parses the framework's outcome string. Unrecognized strings map to [`Self::Other`].
    pub fn from_framework_str(s: &str) -> Self {
        match s {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "skipped" => Self::Skipped,
            _ => Self::Other,
        }
    }
}

/// The long-form representation attached to a report.
///
/// Frameworks hand this over in a few different shapes. The host adapter picks the variant
/// matching what it received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LongRepr {
    /// A `(path, line, message)` location triple, as produced for skips.
    Location {
        /// The file the skip was raised in.
        path: String,
        /// The line, if known.
        line: Option<u32>,
        /// The message, possibly prefixed with `Skipped: `.
        message: String,
    },

    /// An already-rendered block of text, such as a failure traceback.
    Text(String),

    /// Something the adapter could not render.
    Opaque,
}

impl LongRepr {
    /// Returns the text this representation carries, if any.
    ///
    /// For a location triple, this is the message.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Location { message, .. } => Some(message),
            Self::Text(text) => Some(text),
            Self::Opaque => None,
        }
    }

    /// Renders this representation as a single block of text, if it carries any.
    ///
    /// A location triple renders as `path:line: message`.
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Location {
                path,
                line: Some(line),
                message,
            } => Some(format!("{path}:{line}: {message}")),
            Self::Location {
                path,
                line: None,
                message,
            } => Some(format!("{path}: {message}")),
            Self::Text(text) => Some(text.clone()),
            Self::Opaque => None,
        }
    }
}

/// An expected-failure marker attached to a report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XfailMarker {
    /// The reason given with the marker, if any.
    pub reason: Option<String>,

    /// Whether the marker is strict: an unexpected pass should count as a failure.
    pub strict: bool,
}

/// A single phase report for a test.
#[derive(Clone, Debug, PartialEq)]
pub struct TestReport {
    /// The qualified identifier of the test.
    pub node_id: String,

    /// The phase this report is for.
    pub phase: TestPhase,

    /// The raw outcome.
    pub outcome: ReportOutcome,

    /// How long the phase took.
    pub duration: Duration,

    /// The long-form representation, if the framework supplied one.
    pub long_repr: Option<LongRepr>,

    /// The expected-failure marker, if the test carries one.
    pub xfail: Option<XfailMarker>,
}

impl TestReport {
    /// Creates a report with no long-form representation and no marker.
    pub fn new(
        node_id: impl Into<String>,
        phase: TestPhase,
        outcome: ReportOutcome,
        duration: Duration,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            phase,
            outcome,
            duration,
            long_repr: None,
            xfail: None,
        }
    }

    /// Attaches a long-form representation.
    pub fn with_long_repr(mut self, long_repr: LongRepr) -> Self {
        self.long_repr = Some(long_repr);
        self
    }

    /// Attaches an expected-failure marker.
    pub fn with_xfail(mut self, marker: XfailMarker) -> Self {
        self.xfail = Some(marker);
        self
    }
}

/// A report for a node whose collection finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectReport {
    /// The node that was collected. `None` if the framework did not supply one.
    pub node_id: Option<String>,

    /// Whether collection failed.
    pub failed: bool,

    /// The long-form representation of the failure, if any.
    pub long_repr: Option<LongRepr>,
}

/// The summary handed over when the session finishes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    /// The exit status the host is about to return. The bridge never alters it.
    pub exit_status: i32,

    /// The number of collected test items.
    pub collected: usize,
}

/// Lifecycle callbacks invoked by the host framework.
///
/// Callbacks never fail: every internal error is logged to the diagnostic channel and
/// swallowed, so that the bridge can't disturb the host's run.
pub trait LifecycleHooks {
    /// The session has been configured.
    fn session_configured(&mut self);

    /// A node finished collecting. Only failed reports produce an event.
    fn collection_report(&mut self, report: &CollectReport);

    /// Collection finished with the given number of items.
    fn collection_finished(&mut self, collected: usize);

    /// A test is about to run.
    fn test_started(&mut self, item: &TestItem);

    /// A phase of a test finished.
    fn test_report(&mut self, report: &TestReport);

    /// The session finished.
    fn session_finished(&mut self, summary: &SessionSummary);
}
