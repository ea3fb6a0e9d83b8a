// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::Error as _,
    ser::SerializeStruct,
};
use serde_json::Value;
use std::fmt;

// ---
// Event records
// ---

/// A single record in the event stream.
///
/// On the wire, a record is a JSON object with three keys: `eventType`, `payload` and
/// `timestamp`. Records are totally ordered by their position in the stream. The timestamp is
/// informational.
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord {
    /// The kind of event, along with its payload.
    pub kind: EventKind,

    /// Seconds since the Unix epoch at which the record was produced.
    pub timestamp: f64,
}

impl EventRecord {
    /// Creates a new record.
    pub fn new(kind: EventKind, timestamp: f64) -> Self {
        Self { kind, timestamp }
    }

    /// Returns the `eventType` string for this record.
    pub fn event_type(&self) -> &str {
        self.kind.event_type()
    }

    /// Serializes this record as a single newline-terminated JSON line.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl Serialize for EventRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("EventRecord", 3)?;
        state.serialize_field("eventType", self.kind.event_type())?;
        match &self.kind {
            EventKind::CollectionStart(payload) => state.serialize_field("payload", payload)?,
            EventKind::CollectionError(payload) => state.serialize_field("payload", payload)?,
            EventKind::CollectionFinish(payload) => state.serialize_field("payload", payload)?,
            EventKind::GroupDiscovered(payload) | EventKind::GroupStart(payload) => {
                state.serialize_field("payload", payload)?
            }
            EventKind::TestCase(payload) => state.serialize_field("payload", payload)?,
            EventKind::GroupResult(payload) => state.serialize_field("payload", payload)?,
            EventKind::GroupStdout(payload) | EventKind::GroupStderr(payload) => {
                state.serialize_field("payload", payload)?
            }
            EventKind::Unknown(unknown) => state.serialize_field("payload", &unknown.payload)?,
        }
        state.serialize_field("timestamp", &self.timestamp)?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventRecord {
    event_type: String,
    #[serde(default)]
    payload: Value,
    timestamp: f64,
}

impl<'de> Deserialize<'de> for EventRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let RawEventRecord {
            event_type,
            payload,
            timestamp,
        } = RawEventRecord::deserialize(deserializer)?;
        let kind = EventKind::from_parts(event_type, payload).map_err(D::Error::custom)?;
        Ok(Self { kind, timestamp })
    }
}

/// The kind of an event, along with its payload.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum EventKind {
    /// Collection of tests has begun. This is always the first event of a session.
    CollectionStart(CollectionStartPayload),

    /// Collecting a node failed.
    CollectionError(CollectionErrorPayload),

    /// Collection has finished.
    CollectionFinish(CollectionFinishPayload),

    /// A group was seen for the first time.
    GroupDiscovered(GroupPayload),

    /// The first test or subgroup of a group began executing.
    GroupStart(GroupPayload),

    /// A single test produced its final outcome.
    TestCase(TestCasePayload),

    /// The terminal summary for a group.
    GroupResult(GroupResultPayload),

    /// Standard output written while a group was executing.
    GroupStdout(OutputChunkPayload),

    /// Standard error written while a group was executing.
    GroupStderr(OutputChunkPayload),

    /// An event type this version of the crate does not know about.
    Unknown(UnknownEvent),
}

impl EventKind {
    /// The `eventType` string for `collectionStart` events.
    pub const COLLECTION_START: &'static str = "collectionStart";
    /// The `eventType` string for `collectionError` events.
    pub const COLLECTION_ERROR: &'static str = "collectionError";
    /// The `eventType` string for `collectionFinish` events.
    pub const COLLECTION_FINISH: &'static str = "collectionFinish";
    /// The `eventType` string for `testGroupDiscovered` events.
    pub const GROUP_DISCOVERED: &'static str = "testGroupDiscovered";
    /// The `eventType` string for `testGroupStart` events.
    pub const GROUP_START: &'static str = "testGroupStart";
    /// The `eventType` string for `testCase` events.
    pub const TEST_CASE: &'static str = "testCase";
    /// The `eventType` string for `testGroupResult` events.
    pub const GROUP_RESULT: &'static str = "testGroupResult";
    /// The `eventType` string for `groupStdout` events.
    pub const GROUP_STDOUT: &'static str = "groupStdout";
    /// The `eventType` string for `groupStderr` events.
    pub const GROUP_STDERR: &'static str = "groupStderr";

    /// Returns the `eventType` string for this kind.
    pub fn event_type(&self) -> &str {
        match self {
            Self::CollectionStart(_) => Self::COLLECTION_START,
            Self::CollectionError(_) => Self::COLLECTION_ERROR,
            Self::CollectionFinish(_) => Self::COLLECTION_FINISH,
            Self::GroupDiscovered(_) => Self::GROUP_DISCOVERED,
            Self::GroupStart(_) => Self::GROUP_START,
            Self::TestCase(_) => Self::TEST_CASE,
            Self::GroupResult(_) => Self::GROUP_RESULT,
            Self::GroupStdout(_) => Self::GROUP_STDOUT,
            Self::GroupStderr(_) => Self::GROUP_STDERR,
            Self::Unknown(unknown) => &unknown.event_type,
        }
    }

    fn from_parts(event_type: String, payload: Value) -> Result<Self, serde_json::Error> {
        let kind = match event_type.as_str() {
            Self::COLLECTION_START => Self::CollectionStart(serde_json::from_value(payload)?),
            Self::COLLECTION_ERROR => Self::CollectionError(serde_json::from_value(payload)?),
            Self::COLLECTION_FINISH => Self::CollectionFinish(serde_json::from_value(payload)?),
            Self::GROUP_DISCOVERED => Self::GroupDiscovered(serde_json::from_value(payload)?),
            Self::GROUP_START => Self::GroupStart(serde_json::from_value(payload)?),
            Self::TEST_CASE => Self::TestCase(serde_json::from_value(payload)?),
            Self::GROUP_RESULT => Self::GroupResult(serde_json::from_value(payload)?),
            Self::GROUP_STDOUT => Self::GroupStdout(serde_json::from_value(payload)?),
            Self::GROUP_STDERR => Self::GroupStderr(serde_json::from_value(payload)?),
            _ => Self::Unknown(UnknownEvent {
                event_type,
                payload,
            }),
        };
        Ok(kind)
    }
}

/// An event whose type is not known to this crate, preserved as raw JSON.
#[derive(Clone, Debug, PartialEq)]
pub struct UnknownEvent {
    /// The `eventType` string.
    pub event_type: String,

    /// The payload, as-is.
    pub payload: Value,
}

// ---
// Payloads
// ---

/// The phase of the session an event was produced in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    /// Tests are being collected.
    Collection,
}

/// Payload for [`EventKind::CollectionStart`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStartPayload {
    /// Always [`SessionPhase::Collection`].
    pub phase: SessionPhase,
}

/// Payload for [`EventKind::CollectionError`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionErrorPayload {
    /// The node that failed to collect.
    pub file_path: String,

    /// A rendering of the collection failure.
    pub error: String,

    /// Always [`SessionPhase::Collection`].
    pub phase: SessionPhase,
}

/// Payload for [`EventKind::CollectionFinish`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFinishPayload {
    /// The number of collected test items.
    pub collected: usize,
}

/// Payload for [`EventKind::GroupDiscovered`] and [`EventKind::GroupStart`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    /// The name of the group.
    pub group_name: String,

    /// Ancestor group names, root first. Empty for file-level groups.
    #[serde(default)]
    pub parent_names: Vec<String>,
}

/// Payload for [`EventKind::TestCase`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCasePayload {
    /// The leaf name of the test.
    pub test_name: String,

    /// The chain of groups the test belongs to, file first.
    #[serde(default)]
    pub parent_names: Vec<String>,

    /// The classified outcome.
    pub status: TestStatus,

    /// The duration of the test, in milliseconds.
    pub duration: f64,

    /// The failure representation. Present iff `status` is [`TestStatus::Fail`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Why the test was skipped. Present iff `status` is [`TestStatus::Skip`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    /// The phase in which the skip was observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_phase: Option<TestPhase>,

    /// The reason attached to the expected-failure marker, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xfail_reason: Option<String>,
}

/// Payload for [`EventKind::GroupResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResultPayload {
    /// The name of the group.
    pub group_name: String,

    /// Ancestor group names, root first.
    #[serde(default)]
    pub parent_names: Vec<String>,

    /// The aggregate status.
    pub status: GroupStatus,

    /// Milliseconds from group start to session end, or `null` if the group never started.
    pub duration: Option<f64>,

    /// Per-outcome counts.
    pub totals: GroupTotals,

    /// Every failed test under this group. Only present for failed groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_tests: Vec<FailedTestSummary>,
}

/// Per-outcome test counts for a group.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTotals {
    /// The sum of all the other counts.
    pub total: usize,
    /// Tests that passed.
    pub passed: usize,
    /// Tests that failed.
    pub failed: usize,
    /// Tests that were skipped.
    pub skipped: usize,
    /// Tests that were expected to fail and did.
    pub xfailed: usize,
    /// Tests that were expected to fail but passed.
    pub xpassed: usize,
}

impl GroupTotals {
    /// Returns the status implied by these totals.
    ///
    /// Any failure makes the group fail; otherwise any pass makes it pass; otherwise any skip
    /// makes it skipped. Expected failures and unexpected passes do not participate.
    pub fn status(&self) -> GroupStatus {
        if self.failed > 0 {
            GroupStatus::Fail
        } else if self.passed > 0 {
            GroupStatus::Pass
        } else if self.skipped > 0 {
            GroupStatus::Skip
        } else {
            GroupStatus::Unknown
        }
    }
}

/// A failed test listed in a [`GroupResultPayload`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailedTestSummary {
    /// The leaf name of the test.
    pub name: String,

    /// The duration of the test, in milliseconds.
    pub duration: f64,
}

/// Payload for [`EventKind::GroupStdout`] and [`EventKind::GroupStderr`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputChunkPayload {
    /// The group that was executing, if any test had started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,

    /// Ancestors of `group_name`, root first.
    #[serde(default)]
    pub parent_names: Vec<String>,

    /// The captured text.
    pub chunk: String,
}

// ---
// Statuses
// ---

/// The outcome of a single test.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    /// The test passed.
    Pass,
    /// The test failed.
    Fail,
    /// The test was skipped.
    Skip,
    /// The test was expected to fail, and did.
    Xfail,
    /// The test was expected to fail, but passed.
    Xpass,
    /// The framework reported an outcome that isn't recognized.
    Unknown,
}

impl TestStatus {
    /// Returns the wire representation of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
            Self::Xfail => "XFAIL",
            Self::Xpass => "XPASS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The aggregate outcome of a group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupStatus {
    /// At least one test passed and none failed.
    Pass,
    /// At least one test failed.
    Fail,
    /// Every counted test was skipped.
    Skip,
    /// No test passed, failed or was skipped.
    Unknown,
}

impl GroupStatus {
    /// Returns the wire representation of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase of a single test's execution.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestPhase {
    /// Fixtures and other preconditions are being set up.
    Setup,
    /// The test body is running.
    Call,
    /// Fixtures are being torn down.
    Teardown,
}

impl TestPhase {
    /// Returns the wire representation of this phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Call => "call",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for TestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
