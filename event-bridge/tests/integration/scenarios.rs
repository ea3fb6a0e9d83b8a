// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use event_bridge::hooks::LifecycleHooks;
use event_bridge_metadata::{
    EventKind, EventRecord, FailedTestSummary, GroupResultPayload, GroupStatus, GroupTotals,
    TestCasePayload, TestPhase, TestStatus,
};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn test_cases(records: &[EventRecord]) -> Vec<&TestCasePayload> {
    records
        .iter()
        .filter_map(|record| match &record.kind {
            EventKind::TestCase(payload) => Some(payload),
            _ => None,
        })
        .collect()
}

fn group_results(records: &[EventRecord]) -> Vec<&GroupResultPayload> {
    records
        .iter()
        .filter_map(|record| match &record.kind {
            EventKind::GroupResult(payload) => Some(payload),
            _ => None,
        })
        .collect()
}

#[test]
fn pass_and_fail_in_one_class() -> Result<()> {
    let mut controller = active_controller(false);
    controller.collection_finished(2);
    run_test(
        &mut controller,
        "test_math.py::TestMath::test_add",
        &FixtureTest::Pass { millis: 5 },
    );
    run_test(
        &mut controller,
        "test_math.py::TestMath::test_sub",
        &FixtureTest::Fail {
            millis: 3,
            error: "assert 1 == 2",
        },
    );
    finish_session(&mut controller, 1, 2);

    let records = controller.into_sink().unwrap();
    check_stream_structure(&records)?;
    assert_eq!(
        describe_all(&records),
        [
            "collectionStart",
            "collectionFinish",
            "testGroupDiscovered test_math.py",
            "testGroupDiscovered test_math.py > TestMath",
            "testGroupStart test_math.py",
            "testGroupStart test_math.py > TestMath",
            "testCase test_math.py > TestMath > test_add PASS",
            "testCase test_math.py > TestMath > test_sub FAIL",
            "testGroupResult test_math.py FAIL",
        ]
    );

    let cases = test_cases(&records);
    assert_eq!(cases[0].duration, 5.0);
    assert_eq!(cases[0].error, None);
    assert_eq!(cases[1].duration, 3.0);
    assert_eq!(cases[1].error.as_deref(), Some("assert 1 == 2"));

    let results = group_results(&records);
    assert_eq!(
        results[0].totals,
        GroupTotals {
            total: 2,
            passed: 1,
            failed: 1,
            skipped: 0,
            xfailed: 0,
            xpassed: 0,
        }
    );
    assert_eq!(
        results[0].failed_tests,
        [FailedTestSummary {
            name: "TestMath::test_sub".to_owned(),
            duration: 3.0,
        }]
    );
    assert!(results[0].duration.is_some_and(|duration| duration >= 0.0));

    Ok(())
}

#[test]
fn expected_failure_that_fails() -> Result<()> {
    let mut controller = active_controller(false);
    run_test(
        &mut controller,
        "test_xfail.py::test_known_bug",
        &FixtureTest::Xfail {
            reason: Some("bug in parser"),
            strict: false,
            passes: false,
        },
    );
    finish_session(&mut controller, 0, 1);

    let records = controller.into_sink().unwrap();
    check_stream_structure(&records)?;

    let cases = test_cases(&records);
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].status, TestStatus::Xfail);
    assert_eq!(cases[0].parent_names, ["test_xfail.py"]);
    assert_eq!(cases[0].error, None);
    assert_eq!(cases[0].xfail_reason.as_deref(), Some("bug in parser"));

    // Expected failures are counted but don't decide the group's status.
    let results = group_results(&records);
    assert_eq!(results[0].status, GroupStatus::Unknown);
    assert_eq!(results[0].totals.xfailed, 1);
    assert_eq!(results[0].totals.total, 1);

    Ok(())
}

#[test]
fn expected_failure_without_reason() {
    let mut controller = active_controller(false);
    run_test(
        &mut controller,
        "test_xfail.py::test_known_bug",
        &FixtureTest::Xfail {
            reason: None,
            strict: false,
            passes: false,
        },
    );

    let records = controller.into_sink().unwrap();
    let cases = test_cases(&records);
    assert_eq!(cases[0].status, TestStatus::Xfail);
    assert_eq!(cases[0].xfail_reason, None);
}

#[test_case(false, false, TestStatus::Xpass, GroupStatus::Pass ; "non-strict marker")]
#[test_case(true, false, TestStatus::Xpass, GroupStatus::Pass ; "strict marker with default policy")]
#[test_case(true, true, TestStatus::Fail, GroupStatus::Fail ; "strict marker with failing policy")]
fn unexpected_pass(
    strict: bool,
    strict_xpass_fails: bool,
    expected_test: TestStatus,
    expected_group: GroupStatus,
) {
    let mut controller = active_controller(strict_xpass_fails);
    run_test(
        &mut controller,
        "test_xfail.py::test_ok",
        &FixtureTest::Pass { millis: 1 },
    );
    run_test(
        &mut controller,
        "test_xfail.py::test_fixed_bug",
        &FixtureTest::Xfail {
            reason: Some("bug 7"),
            strict,
            passes: true,
        },
    );
    finish_session(&mut controller, 0, 2);

    let records = controller.into_sink().unwrap();
    let cases = test_cases(&records);
    assert_eq!(cases[1].status, expected_test);
    assert_eq!(cases[1].xfail_reason.as_deref(), Some("bug 7"));
    assert_eq!(group_results(&records)[0].status, expected_group);
}

#[test]
fn skip_reported_once_across_phases() -> Result<()> {
    let mut controller = active_controller(false);
    run_test(
        &mut controller,
        "test_db.py::TestDb::test_query",
        &FixtureTest::SkipInSetup {
            reason: "no database",
        },
    );
    finish_session(&mut controller, 0, 1);

    let records = controller.into_sink().unwrap();
    check_stream_structure(&records)?;

    let cases = test_cases(&records);
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].status, TestStatus::Skip);
    assert_eq!(cases[0].skip_reason.as_deref(), Some("no database"));
    assert_eq!(cases[0].skip_phase, Some(TestPhase::Setup));

    let results = group_results(&records);
    assert_eq!(results[0].status, GroupStatus::Skip);
    assert_eq!(results[0].totals.skipped, 1);
    assert!(results[0].failed_tests.is_empty());

    Ok(())
}

#[test]
fn one_result_per_file_in_discovery_order() -> Result<()> {
    let mut controller = active_controller(false);
    run_test(&mut controller, "b.py::test_b", &FixtureTest::Pass { millis: 1 });
    run_test(
        &mut controller,
        "a.py::TestA::Nested::test_a",
        &FixtureTest::Pass { millis: 1 },
    );
    run_test(&mut controller, "b.py::test_b2", &FixtureTest::Pass { millis: 1 });
    finish_session(&mut controller, 0, 3);

    let records = controller.into_sink().unwrap();
    check_stream_structure(&records)?;

    let results = group_results(&records);
    let names: Vec<_> = results
        .iter()
        .map(|result| result.group_name.as_str())
        .collect();
    assert_eq!(names, ["b.py", "a.py"]);
    assert_eq!(results[0].totals.passed, 2);
    assert!(results.iter().all(|result| result.parent_names.is_empty()));

    Ok(())
}

#[test]
fn collection_error_does_not_stop_reporting() -> Result<()> {
    let mut controller = active_controller(false);
    controller.collection_report(&event_bridge::hooks::CollectReport {
        node_id: Some("test_broken.py".to_owned()),
        failed: true,
        long_repr: Some(event_bridge::hooks::LongRepr::Text(
            "ImportError: No module named 'missing'".to_owned(),
        )),
    });
    controller.collection_finished(1);
    run_test(&mut controller, "test_ok.py::test_ok", &FixtureTest::Pass { millis: 2 });
    finish_session(&mut controller, 2, 1);

    let records = controller.into_sink().unwrap();
    check_stream_structure(&records)?;
    match &records[1].kind {
        EventKind::CollectionError(payload) => {
            assert_eq!(payload.file_path, "test_broken.py");
            assert_eq!(payload.error, "ImportError: No module named 'missing'");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(test_cases(&records).len(), 1);

    Ok(())
}

#[test]
fn malformed_identifier_degrades() -> Result<()> {
    let mut controller = active_controller(false);
    run_test(&mut controller, "doctest_only", &FixtureTest::Pass { millis: 1 });
    finish_session(&mut controller, 0, 1);

    let records = controller.into_sink().unwrap();
    check_stream_structure(&records)?;
    assert_eq!(
        describe_all(&records),
        [
            "collectionStart",
            "testGroupDiscovered doctest_only",
            "testGroupStart doctest_only",
            "testCase doctest_only > doctest_only PASS",
            "testGroupResult doctest_only PASS",
        ]
    );

    Ok(())
}
