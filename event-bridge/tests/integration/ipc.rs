// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use event_bridge::{
    config::BridgeConfig,
    controller::{ControllerState, SessionController},
    hooks::LifecycleHooks,
    role::{ProcessEnv, ProcessRole},
};
use event_bridge_metadata::{EventKind, EventReader, read_events};
use pretty_assertions::assert_eq;
use std::{fs::File, io::BufReader};

fn env_for(vars: &[(&str, &str)]) -> ProcessEnv {
    vars.iter().copied().collect()
}

fn run_math_session<S: LifecycleHooks>(hooks: &mut S) {
    hooks.session_configured();
    hooks.collection_finished(2);
    run_test(
        hooks,
        "test_math.py::TestMath::test_add",
        &FixtureTest::Pass { millis: 5 },
    );
    run_test(
        hooks,
        "test_math.py::TestMath::test_sub",
        &FixtureTest::Fail {
            millis: 3,
            error: "assert 1 == 2",
        },
    );
    finish_session(hooks, 1, 2);
}

#[test]
fn sessions_append_to_one_stream() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let ipc_path = dir.path().join("events.jsonl");
    let env = env_for(&[("EVENT_BRIDGE_IPC_PATH", ipc_path.as_str())]);
    let config = BridgeConfig::from_env(&env)?;

    let mut first = SessionController::from_config(&config, &env);
    run_math_session(&mut first);
    assert_eq!(first.state(), ControllerState::Finalized);
    let first_len = read_events(BufReader::new(File::open(&ipc_path)?))?.len();
    assert_eq!(first_len, 9);

    // A second, independent session appends to the same stream.
    let mut second = SessionController::from_config(&config, &env);
    run_math_session(&mut second);

    let records = read_events(BufReader::new(File::open(&ipc_path)?))?;
    assert_eq!(records.len(), 2 * first_len);
    assert_eq!(
        describe_all(&records[..first_len]),
        describe_all(&records[first_len..])
    );
    check_stream_structure(&records[first_len..])?;

    // Every record is on its own newline-terminated line.
    let contents = std::fs::read_to_string(&ipc_path)?;
    assert!(contents.ends_with('\n'));
    assert_eq!(contents.lines().count(), records.len());

    Ok(())
}

#[test]
fn reader_follows_a_live_stream() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let ipc_path = dir.path().join("events.jsonl");
    let env = env_for(&[("EVENT_BRIDGE_IPC_PATH", ipc_path.as_str())]);
    let config = BridgeConfig::from_env(&env)?;

    let mut controller = SessionController::from_config(&config, &env);
    controller.session_configured();
    controller.collection_finished(1);

    let mut reader = EventReader::new(BufReader::new(File::open(&ipc_path)?));
    let seen: Vec<_> = reader.by_ref().collect::<Result<_, _>>()?;
    assert_eq!(seen.len(), 2);

    run_test(
        &mut controller,
        "test_live.py::test_live",
        &FixtureTest::Pass { millis: 1 },
    );
    let seen: Vec<_> = reader.by_ref().collect::<Result<_, _>>()?;
    assert_eq!(
        describe_all(&seen),
        [
            "testGroupDiscovered test_live.py",
            "testGroupStart test_live.py",
            "testCase test_live.py > test_live PASS",
        ]
    );
    assert!(!reader.has_partial_line());

    Ok(())
}

#[test]
fn worker_never_writes() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let ipc_path = dir.path().join("events.jsonl");
    let env = env_for(&[
        ("EVENT_BRIDGE_IPC_PATH", ipc_path.as_str()),
        ("PYTEST_XDIST_WORKER", "gw1"),
    ]);
    let config = BridgeConfig::from_env(&env)?;

    let mut controller = SessionController::from_config(&config, &env);
    assert_eq!(
        controller.role(),
        &ProcessRole::Worker {
            marker: "PYTEST_XDIST_WORKER".to_owned()
        }
    );
    for _ in 0..50 {
        run_math_session(&mut controller);
    }

    assert_eq!(controller.state(), ControllerState::Uninitialized);
    assert!(!ipc_path.exists(), "worker must not create the stream");

    Ok(())
}

#[test]
fn idle_without_ipc_path() -> Result<()> {
    let env = ProcessEnv::default();
    let config = BridgeConfig::from_env(&env)?;

    let mut controller = SessionController::from_config(&config, &env);
    run_math_session(&mut controller);
    assert_eq!(controller.state(), ControllerState::Uninitialized);
    assert!(controller.sink().is_none());

    Ok(())
}

#[test]
fn unwritable_stream_does_not_disturb_the_session() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let ipc_path = dir.path().join("missing-dir").join("events.jsonl");
    let env = env_for(&[("EVENT_BRIDGE_IPC_PATH", ipc_path.as_str())]);
    let config = BridgeConfig::from_env(&env)?;

    let mut controller = SessionController::from_config(&config, &env);
    run_math_session(&mut controller);
    assert_eq!(controller.state(), ControllerState::Finalized);
    assert!(!ipc_path.exists());

    Ok(())
}

#[test]
fn timestamps_are_epoch_seconds() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    let ipc_path = dir.path().join("events.jsonl");
    let env = env_for(&[("EVENT_BRIDGE_IPC_PATH", ipc_path.as_str())]);
    let config = BridgeConfig::from_env(&env)?;

    let before = chrono::Utc::now().timestamp() as f64;
    let mut controller = SessionController::from_config(&config, &env);
    run_math_session(&mut controller);
    let after = chrono::Utc::now().timestamp() as f64 + 1.0;

    let records = read_events(BufReader::new(File::open(&ipc_path)?))?;
    for record in &records {
        assert!(
            (before..=after).contains(&record.timestamp),
            "timestamp {} out of range",
            record.timestamp
        );
    }
    assert!(matches!(records[0].kind, EventKind::CollectionStart(_)));

    Ok(())
}
