// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classifying phase reports into test outcomes.
//!
//! The host reports each test in up to three phases. Exactly one of those reports is
//! authoritative for a given test:
//!
//! 1. A skip in any phase, unless the test carries an expected-failure marker. A test is only
//!    ever reported as skipped once, even if several phases report the skip.
//! 2. Otherwise, the call phase. With an expected-failure marker, a pass is an unexpected pass
//!    and anything else is an expected failure.
//! 3. Otherwise, the call phase's raw outcome.
//!
//! Setup and teardown reports that aren't skips are intermediate and produce nothing.

use crate::{
    hierarchy::{TestHierarchy, TestKey},
    hooks::{LongRepr, ReportOutcome, TestReport, XfailMarker},
    stopwatch::duration_millis,
};
use event_bridge_metadata::{TestPhase, TestStatus};
use std::collections::HashSet;

/// The reason used when a skip doesn't carry a readable one.
pub const DEFAULT_SKIP_REASON: &str = "Test skipped";

/// The error used when a failure doesn't carry a readable representation.
pub const DEFAULT_FAILURE: &str = "Test failed";

const SKIPPED_PREFIX: &str = "Skipped: ";

/// The final outcome of a single test.
#[derive(Clone, Debug, PartialEq)]
pub struct TestOutcome {
    /// The classified status.
    pub status: TestStatus,

    /// The duration of the authoritative phase, in milliseconds.
    pub duration_ms: f64,

    /// The failure representation. Set iff `status` is [`TestStatus::Fail`].
    pub error: Option<String>,

    /// Why the test was skipped. Set iff `status` is [`TestStatus::Skip`].
    pub skip_reason: Option<String>,

    /// The phase the skip was observed in.
    pub skip_phase: Option<TestPhase>,

    /// The reason attached to the expected-failure marker.
    pub xfail_reason: Option<String>,
}

impl TestOutcome {
    fn new(status: TestStatus, duration_ms: f64) -> Self {
        Self {
            status,
            duration_ms,
            error: None,
            skip_reason: None,
            skip_phase: None,
            xfail_reason: None,
        }
    }
}

/// The result of classifying one phase report.
#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    /// The report is not authoritative for its test.
    Intermediate,

    /// The report determines the test's outcome.
    Terminal(TestOutcome),

    /// The report would determine an outcome, but one was already produced for this test.
    Duplicate,
}

/// Classifies phase reports, remembering which tests have already produced an outcome.
#[derive(Clone, Debug, Default)]
pub struct OutcomeClassifier {
    processed: HashSet<TestKey>,
    strict_xpass_fails: bool,
}

impl OutcomeClassifier {
    /// Creates a new classifier.
    ///
    /// If `strict_xpass_fails` is true, an unexpected pass of a test with a strict
    /// expected-failure marker is classified as a failure.
    pub fn new(strict_xpass_fails: bool) -> Self {
        Self {
            processed: HashSet::new(),
            strict_xpass_fails,
        }
    }

    /// Returns true if an outcome was already produced for this test.
    pub fn is_processed(&self, key: &TestKey) -> bool {
        self.processed.contains(key)
    }

    /// Classifies a single phase report for the test described by `hierarchy`.
    pub fn classify(
        &mut self,
        report: &TestReport,
        hierarchy: &TestHierarchy<'_>,
    ) -> Classification {
        let duration_ms = duration_millis(report.duration);

        if report.outcome == ReportOutcome::Skipped && report.xfail.is_none() {
            if !self.processed.insert(hierarchy.test_key()) {
                return Classification::Duplicate;
            }
            let mut outcome = TestOutcome::new(TestStatus::Skip, duration_ms);
            outcome.skip_reason = Some(skip_reason(report.long_repr.as_ref()));
            outcome.skip_phase = Some(report.phase);
            return Classification::Terminal(outcome);
        }

        if report.phase != TestPhase::Call {
            return Classification::Intermediate;
        }
        if !self.processed.insert(hierarchy.test_key()) {
            return Classification::Duplicate;
        }

        let outcome = match &report.xfail {
            Some(marker) => self.classify_xfail(report.outcome, marker, duration_ms),
            None => match report.outcome {
                ReportOutcome::Passed => TestOutcome::new(TestStatus::Pass, duration_ms),
                ReportOutcome::Failed => {
                    let mut outcome = TestOutcome::new(TestStatus::Fail, duration_ms);
                    outcome.error = Some(failure_text(report.long_repr.as_ref()));
                    outcome
                }
                ReportOutcome::Skipped => {
                    // Unmarked skips are handled above, but keep the mapping total.
                    let mut outcome = TestOutcome::new(TestStatus::Skip, duration_ms);
                    outcome.skip_reason = Some(skip_reason(report.long_repr.as_ref()));
                    outcome.skip_phase = Some(report.phase);
                    outcome
                }
                ReportOutcome::Other => TestOutcome::new(TestStatus::Unknown, duration_ms),
            },
        };
        Classification::Terminal(outcome)
    }

    fn classify_xfail(
        &self,
        raw: ReportOutcome,
        marker: &XfailMarker,
        duration_ms: f64,
    ) -> TestOutcome {
        let mut outcome = match raw {
            ReportOutcome::Passed if marker.strict && self.strict_xpass_fails => {
                let mut outcome = TestOutcome::new(TestStatus::Fail, duration_ms);
                outcome.error = Some(format!(
                    "[XPASS(strict)] {}",
                    marker.reason.as_deref().unwrap_or_default()
                ));
                outcome
            }
            ReportOutcome::Passed => TestOutcome::new(TestStatus::Xpass, duration_ms),
            ReportOutcome::Failed | ReportOutcome::Skipped | ReportOutcome::Other => {
                TestOutcome::new(TestStatus::Xfail, duration_ms)
            }
        };
        outcome.xfail_reason = marker.reason.clone();
        outcome
    }
}

/// Extracts a human-readable skip reason from a raw representation.
///
/// A leading `Skipped: ` is stripped. Falls back to [`DEFAULT_SKIP_REASON`] if there's no
/// readable text.
pub fn skip_reason(long_repr: Option<&LongRepr>) -> String {
    match long_repr.and_then(LongRepr::text) {
        Some(text) => text.strip_prefix(SKIPPED_PREFIX).unwrap_or(text).to_owned(),
        None => DEFAULT_SKIP_REASON.to_owned(),
    }
}

fn failure_text(long_repr: Option<&LongRepr>) -> String {
    long_repr
        .and_then(LongRepr::render)
        .unwrap_or_else(|| DEFAULT_FAILURE.to_owned())
}
