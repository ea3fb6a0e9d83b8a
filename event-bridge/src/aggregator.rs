// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Accumulating test outcomes into per-group results.
//!
//! Outcomes are folded in as they are classified. At session end, [`Aggregator::finalize`]
//! produces one result for every top-level group.

use crate::{
    classifier::TestOutcome,
    registry::GroupPath,
    stopwatch::{StopwatchStart, stopwatch},
};
use chrono::{DateTime, Local};
use event_bridge_metadata::{
    FailedTestSummary, GroupResultPayload, GroupStatus, GroupTotals, TestStatus,
};
use indexmap::IndexMap;
use std::collections::HashMap;

/// A test outcome, as retained for group results.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedTest {
    /// The group the test belongs to.
    pub group: GroupPath,

    /// The test's name within its file, e.g. `TestMath::test_add`.
    pub name: String,

    /// The classified status.
    pub status: TestStatus,

    /// The duration in milliseconds.
    pub duration_ms: f64,
}

/// Accumulates per-file counters, per-group test records and group start times.
#[derive(Debug, Default)]
pub struct Aggregator {
    totals: IndexMap<String, GroupTotals>,
    // In classification order.
    tests: Vec<RecordedTest>,
    started: HashMap<GroupPath, StopwatchStart>,
}

impl Aggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a group started, returning its start time.
    ///
    /// Only the first call for a given group has an effect: later calls return the time recorded
    /// by the first one.
    pub fn record_group_start(&mut self, group: &GroupPath) -> DateTime<Local> {
        self.started
            .entry(group.clone())
            .or_insert_with(stopwatch)
            .start_time()
    }

    /// Returns the time a group started, if it has.
    pub fn group_start_time(&self, group: &GroupPath) -> Option<DateTime<Local>> {
        self.started.get(group).map(StopwatchStart::start_time)
    }

    /// Folds in a classified outcome for a test in `group`.
    ///
    /// The outcome counts towards the top-level group `group` belongs to.
    pub fn record_test(&mut self, group: &GroupPath, name: &str, outcome: &TestOutcome) {
        let totals = self.totals.entry(group.root_name().to_owned()).or_default();
        let counter = match outcome.status {
            TestStatus::Pass => Some(&mut totals.passed),
            TestStatus::Fail => Some(&mut totals.failed),
            TestStatus::Skip => Some(&mut totals.skipped),
            TestStatus::Xfail => Some(&mut totals.xfailed),
            TestStatus::Xpass => Some(&mut totals.xpassed),
            TestStatus::Unknown => None,
        };
        if let Some(counter) = counter {
            *counter += 1;
            totals.total += 1;
        }

        self.tests.push(RecordedTest {
            group: group.clone(),
            name: name.to_owned(),
            status: outcome.status,
            duration_ms: outcome.duration_ms,
        });
    }

    /// Returns the totals for a top-level group.
    pub fn totals(&self, file: &str) -> GroupTotals {
        self.totals.get(file).copied().unwrap_or_default()
    }

    /// Returns every recorded test in `group` or any of its descendants, in classification
    /// order.
    pub fn tests_under<'a>(
        &'a self,
        group: &'a GroupPath,
    ) -> impl Iterator<Item = &'a RecordedTest> + 'a {
        self.tests.iter().filter(move |test| group.contains(&test.group))
    }

    /// Computes the terminal result for each of the given top-level groups, in order.
    ///
    /// Durations are measured up to the moment this is called.
    pub fn finalize<'a>(
        &self,
        top_level: impl IntoIterator<Item = &'a GroupPath>,
    ) -> Vec<GroupResultPayload> {
        top_level
            .into_iter()
            .map(|group| self.finalize_group(group))
            .collect()
    }

    fn finalize_group(&self, group: &GroupPath) -> GroupResultPayload {
        let totals = self.totals(group.name());
        let status = totals.status();
        let duration = self
            .started
            .get(group)
            .map(|start| start.snapshot().millis());

        let failed_tests = if status == GroupStatus::Fail {
            self.tests_under(group)
                .filter(|test| test.status == TestStatus::Fail)
                .map(|test| FailedTestSummary {
                    name: test.name.clone(),
                    duration: test.duration_ms,
                })
                .collect()
        } else {
            Vec::new()
        };

        GroupResultPayload {
            group_name: group.name().to_owned(),
            parent_names: group.parent_names().to_vec(),
            status,
            duration,
            totals,
            failed_tests,
        }
    }
}
