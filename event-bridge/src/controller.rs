// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session controller.
//!
//! [`SessionController`] owns all of a session's mutable state and translates lifecycle
//! callbacks into events. It moves through three states:
//!
//! * `Uninitialized`: the initial state. A controller without a sink, or running in a worker
//!   process, stays here for its whole lifetime and ignores every callback.
//! * `Active`: entered on session configuration. Callbacks produce events.
//! * `Finalized`: entered on session finish, after group results are written. Further callbacks
//!   are ignored.

use crate::{
    aggregator::Aggregator,
    capture::OutputStream,
    classifier::{Classification, OutcomeClassifier, TestOutcome},
    config::BridgeConfig,
    diagnostic::init_diagnostic_log,
    errors::DisplayErrorChain,
    hierarchy::TestHierarchy,
    hooks::{CollectReport, LifecycleHooks, ReportOutcome, SessionSummary, TestItem, TestReport},
    registry::{GroupPath, GroupRegistry, GroupTransition},
    role::{ProcessEnv, ProcessRole},
    sink::{EventSink, IpcSink},
};
use chrono::{SecondsFormat, Utc};
use debug_ignore::DebugIgnore;
use event_bridge_metadata::{
    CollectionErrorPayload, CollectionFinishPayload, CollectionStartPayload, EventKind,
    EventRecord, GroupPayload, OutputChunkPayload, SessionPhase, TestCasePayload,
};
use tracing::{debug, error, info, warn};

/// The node id reported for collection errors that aren't attributed to a node.
pub const COLLECTION_NODE_ID: &str = "__collection__";

/// The error reported for collection errors without a representation.
pub const DEFAULT_COLLECTION_ERROR: &str = "Collection failed";

/// The lifecycle state of a [`SessionController`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// The session hasn't been configured, or the controller is idle.
    Uninitialized,
    /// Events are being produced.
    Active,
    /// The session finished. No further events are produced.
    Finalized,
}

/// Translates lifecycle callbacks into an event stream.
///
/// Construct one controller per process and drive it from the host framework's callback thread.
#[derive(Debug)]
pub struct SessionController<S = IpcSink> {
    state: ControllerState,
    sink: DebugIgnore<Option<S>>,
    role: ProcessRole,
    registry: GroupRegistry,
    classifier: OutcomeClassifier,
    aggregator: Aggregator,
    current_group: Option<GroupPath>,
}

impl SessionController<IpcSink> {
    /// Creates a controller configured from the current process environment.
    ///
    /// This never fails. If the configuration can't be read, the controller is idle.
    pub fn from_env() -> Self {
        let env = ProcessEnv::capture();
        match BridgeConfig::from_env(&env) {
            Ok(config) => Self::from_config(&config, &env),
            Err(err) => {
                // No diagnostic log can be set up without a config, so this is usually
                // discarded.
                warn!(
                    "failed to read configuration, staying idle: {}",
                    DisplayErrorChain::new(&err)
                );
                Self::new(None, ProcessRole::Coordinator, false)
            }
        }
    }

    /// Creates a controller from an already-read configuration.
    ///
    /// Installs the diagnostic log if one is configured, warns about unknown config keys, and
    /// detects the process role from `env`.
    pub fn from_config(config: &BridgeConfig, env: &ProcessEnv) -> Self {
        if let Some(log_path) = config.log_path() {
            if let Err(err) = init_diagnostic_log(log_path, config.log_level()) {
                warn!(
                    "failed to initialize diagnostic log: {}",
                    DisplayErrorChain::new(&err)
                );
            }
        }

        for key in config.unknown_keys() {
            warn!("ignoring unknown config key `{key}`");
        }

        let role = ProcessRole::detect(env, config.worker_markers());
        let sink = config.ipc_path().map(IpcSink::new);
        Self::new(sink, role, config.strict_xpass_fails())
    }
}

impl<S: EventSink> SessionController<S> {
    /// Creates a controller writing to `sink`. With no sink, the controller is idle.
    pub fn new(sink: Option<S>, role: ProcessRole, strict_xpass_fails: bool) -> Self {
        Self {
            state: ControllerState::Uninitialized,
            sink: DebugIgnore(sink),
            role,
            registry: GroupRegistry::new(),
            classifier: OutcomeClassifier::new(strict_xpass_fails),
            aggregator: Aggregator::new(),
            current_group: None,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Returns true if callbacks currently produce events.
    pub fn is_active(&self) -> bool {
        self.state == ControllerState::Active
    }

    /// Returns the role detected for this process.
    pub fn role(&self) -> &ProcessRole {
        &self.role
    }

    /// Returns the sink, if any.
    pub fn sink(&self) -> Option<&S> {
        self.sink.0.as_ref()
    }

    /// Consumes the controller, returning the sink.
    pub fn into_sink(self) -> Option<S> {
        self.sink.0
    }

    /// Returns the group registry.
    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    /// Returns the group of the test that most recently started, if any.
    pub fn current_group(&self) -> Option<&GroupPath> {
        self.current_group.as_ref()
    }

    // ---
    // Helper methods
    // ---

    fn emit(&mut self, kind: EventKind) {
        let Some(sink) = self.sink.0.as_mut() else {
            return;
        };
        let now = Utc::now();
        let timestamp = now.timestamp_micros() as f64 / 1_000_000.0;
        let record = EventRecord::new(kind, timestamp);
        if let Err(err) = sink.write_event(&record) {
            error!(
                "failed to write {} event: {}",
                record.event_type(),
                DisplayErrorChain::new(&err)
            );
        }
    }

    /// Discovers every group on the test's chain, then starts them, outermost first.
    fn discover_and_start(&mut self, hierarchy: &TestHierarchy<'_>, group: &GroupPath) {
        for discovered in self
            .registry
            .discover_groups(hierarchy.file_path, &hierarchy.suite_chain)
        {
            self.emit_discovered(&discovered);
        }

        for transition in self.registry.ensure_group_started(group) {
            match transition {
                GroupTransition::Discovered(discovered) => self.emit_discovered(&discovered),
                GroupTransition::Started(started) => {
                    let start_time = self.aggregator.record_group_start(&started);
                    debug!(
                        "group started: {started} at {}",
                        start_time.to_rfc3339_opts(SecondsFormat::Millis, true)
                    );
                    self.emit(EventKind::GroupStart(group_payload(&started)));
                }
            }
        }
    }

    fn emit_discovered(&mut self, group: &GroupPath) {
        debug!("group discovered: {group}");
        self.emit(EventKind::GroupDiscovered(group_payload(group)));
    }

    fn emit_test_case(
        &mut self,
        hierarchy: &TestHierarchy<'_>,
        group: &GroupPath,
        outcome: TestOutcome,
    ) {
        self.aggregator
            .record_test(group, hierarchy.qualified_name(), &outcome);

        let payload = TestCasePayload {
            test_name: hierarchy.test_name.to_owned(),
            parent_names: group.chain().map(str::to_owned).collect(),
            status: outcome.status,
            duration: outcome.duration_ms,
            error: outcome.error,
            skip_reason: outcome.skip_reason,
            skip_phase: outcome.skip_phase,
            xfail_reason: outcome.xfail_reason,
        };
        self.emit(EventKind::TestCase(payload));
    }

    pub(crate) fn record_output(&mut self, stream: OutputStream, chunk: String) {
        if !self.is_active() {
            return;
        }
        let (group_name, parent_names) = match &self.current_group {
            Some(group) => (Some(group.name().to_owned()), group.parent_names().to_vec()),
            None => (None, Vec::new()),
        };
        let payload = OutputChunkPayload {
            group_name,
            parent_names,
            chunk,
        };
        let kind = match stream {
            OutputStream::Stdout => EventKind::GroupStdout(payload),
            OutputStream::Stderr => EventKind::GroupStderr(payload),
        };
        self.emit(kind);
    }
}

impl<S: EventSink> LifecycleHooks for SessionController<S> {
    fn session_configured(&mut self) {
        if self.state != ControllerState::Uninitialized {
            debug!("session configured again in state {:?}, ignoring", self.state);
            return;
        }
        if self.sink.0.is_none() {
            debug!("no IPC path configured, staying idle");
            return;
        }
        if !self.role.is_reporter() {
            info!("running as {}, staying silent", self.role);
            return;
        }

        self.state = ControllerState::Active;
        info!("session active");
        self.emit(EventKind::CollectionStart(CollectionStartPayload {
            phase: SessionPhase::Collection,
        }));
    }

    fn collection_report(&mut self, report: &CollectReport) {
        if !self.is_active() || !report.failed {
            return;
        }

        let file_path = report
            .node_id
            .as_deref()
            .filter(|node_id| !node_id.is_empty())
            .unwrap_or(COLLECTION_NODE_ID);
        let error = report
            .long_repr
            .as_ref()
            .and_then(|long_repr| long_repr.render())
            .unwrap_or_else(|| DEFAULT_COLLECTION_ERROR.to_owned());
        debug!("collection error in {file_path}");

        self.emit(EventKind::CollectionError(CollectionErrorPayload {
            file_path: file_path.to_owned(),
            error,
            phase: SessionPhase::Collection,
        }));
    }

    fn collection_finished(&mut self, collected: usize) {
        if !self.is_active() {
            return;
        }
        self.emit(EventKind::CollectionFinish(CollectionFinishPayload {
            collected,
        }));
    }

    fn test_started(&mut self, item: &TestItem) {
        if !self.is_active() {
            return;
        }
        let hierarchy = TestHierarchy::resolve(&item.node_id);
        let Some(group) = GroupPath::from_chain(&hierarchy.group_chain()) else {
            return;
        };
        self.discover_and_start(&hierarchy, &group);
        self.current_group = Some(group);
    }

    fn test_report(&mut self, report: &TestReport) {
        if !self.is_active() {
            return;
        }
        let hierarchy = TestHierarchy::resolve(&report.node_id);

        let outcome = match self.classifier.classify(report, &hierarchy) {
            Classification::Terminal(outcome) => outcome,
            Classification::Intermediate => {
                if report.outcome == ReportOutcome::Failed {
                    debug!(
                        "{} failure for {} is not reported as a test outcome",
                        report.phase, report.node_id
                    );
                }
                return;
            }
            Classification::Duplicate => {
                debug!(
                    "duplicate {} report for {} suppressed",
                    report.phase, report.node_id
                );
                return;
            }
        };
        debug!("{} classified as {}", report.node_id, outcome.status);

        let Some(group) = GroupPath::from_chain(&hierarchy.group_chain()) else {
            return;
        };
        self.discover_and_start(&hierarchy, &group);
        self.emit_test_case(&hierarchy, &group, outcome);
    }

    fn session_finished(&mut self, summary: &SessionSummary) {
        if !self.is_active() {
            return;
        }
        info!(
            "session finished with exit status {} ({} collected)",
            summary.exit_status, summary.collected
        );

        let results = self.aggregator.finalize(self.registry.top_level_groups());
        for result in results {
            debug!("group {} finished: {}", result.group_name, result.status);
            self.emit(EventKind::GroupResult(result));
        }

        self.current_group = None;
        self.state = ControllerState::Finalized;
    }
}

fn group_payload(group: &GroupPath) -> GroupPayload {
    GroupPayload {
        group_name: group.name().to_owned(),
        parent_names: group.parent_names().to_vec(),
    }
}
