// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use event_bridge::{
    config::BridgeConfig,
    controller::{ControllerState, SessionController},
    diagnostic::init_diagnostic_log,
    errors::LogInitError,
    hooks::LifecycleHooks,
    role::ProcessEnv,
};

// This is the only test in this binary that installs the diagnostic log, since it can be
// installed once per process.
#[test]
fn sink_failures_go_to_the_diagnostic_log() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let ipc_path = dir.path().join("missing-dir").join("events.jsonl");
    let log_path = dir.path().join("bridge.log");
    let env: ProcessEnv = [
        ("EVENT_BRIDGE_IPC_PATH", ipc_path.as_str()),
        ("EVENT_BRIDGE_LOG_PATH", log_path.as_str()),
        ("EVENT_BRIDGE_LOG_LEVEL", "event_bridge=debug"),
        ("EVENT_BRIDGE_STRICT_XPAS_FAILS", "true"),
    ]
    .into_iter()
    .collect();
    let config = BridgeConfig::from_env(&env)?;

    let mut controller = SessionController::from_config(&config, &env);
    controller.session_configured();
    run_test(
        &mut controller,
        "test_math.py::test_add",
        &FixtureTest::Pass { millis: 1 },
    );
    finish_session(&mut controller, 0, 1);
    assert_eq!(controller.state(), ControllerState::Finalized);

    let log = std::fs::read_to_string(&log_path)?;
    assert!(
        log.starts_with("--- session started "),
        "log starts with a header:\n{log}"
    );
    assert!(log.contains(&format!("(pid {}, cwd ", std::process::id())), "{log}");
    assert!(
        log.contains("failed to write collectionStart event"),
        "{log}"
    );
    assert!(log.contains("caused by:"), "{log}");
    assert!(
        log.contains(&format!("error operating on path {ipc_path}")),
        "{log}"
    );
    assert!(log.contains("group started: test_math.py at 20"), "{log}");
    assert!(log.contains("exit status 0"), "{log}");
    assert!(
        log.contains("ignoring unknown config key `strict_xpas_fails`"),
        "{log}"
    );

    // The log can only be installed once.
    match init_diagnostic_log(&log_path, "warn") {
        Err(LogInitError::AlreadyInitialized) => {}
        other => panic!("unexpected result {other:?}"),
    }

    Ok(())
}

#[test]
fn invalid_directive_is_rejected_before_installing() {
    let dir = Utf8TempDir::new().unwrap();
    match init_diagnostic_log(&dir.path().join("bridge.log"), "event_bridge=loud") {
        Err(LogInitError::InvalidDirective { input, .. }) => {
            assert_eq!(input, "event_bridge=loud")
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert!(!dir.path().join("bridge.log").exists());
}
