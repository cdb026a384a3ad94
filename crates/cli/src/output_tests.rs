// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ferry_capture::{Definition, ManifestBuilder, Registry};
use ferry_core::{BackendStatus, ErrorKind, JobError};
use serial_test::serial;

fn plain() {
    std::env::set_var("NO_COLOR", "1");
}

#[test]
#[serial]
fn failure_text_includes_diagnostic_lines() {
    plain();
    let result = JobResult::failure(
        JobError::new(ErrorKind::Execution, "ValueError: bad radius")
            .diagnostic("Traceback (most recent call last):\n  File \"captured.py\""),
        BackendStatus::Completed,
    )
    .with_exit_code(Some(1));

    let text = failure_text(&JobId::from_string("job-7"), &result);

    assert_eq!(
        text,
        "error execution: ValueError: bad radius\n\
         job: job-7\n\
         exit code: 1\n\
         Traceback (most recent call last):\n  File \"captured.py\"\n"
    );
}

#[test]
#[serial]
fn completed_job_without_result_reads_as_a_failure() {
    plain();
    let result = JobResult::failure(
        JobError::new(ErrorKind::ResultMissing, "no result artifact"),
        BackendStatus::Completed,
    )
    .with_exit_code(Some(0));

    let text = failure_text(&JobId::from_string("job-7"), &result);

    assert!(text.starts_with("error result_missing: no result artifact\n"), "got {text:?}");
    assert!(!text.contains("completed"));
}

#[test]
fn success_has_no_failure_text() {
    let result = JobResult::success(serde_json::json!(1), BackendStatus::Completed);
    assert_eq!(failure_text(&JobId::from_string("job-7"), &result), "");
}

#[test]
#[serial]
fn manifest_text_lists_definitions_in_order() {
    plain();
    let mut registry = Registry::new();
    registry.register(Definition::function("area", "def area(r):\n    return PI * r * r\n")).unwrap();
    registry.register(Definition::constant("PI", "PI = 3.14159\n")).unwrap();
    let manifest = ManifestBuilder::new(&registry).build("area").unwrap();

    let text = manifest_text(&manifest);

    assert_eq!(text, "entry: area\ndefinitions:\n  PI\n  area\ninterpreter: python3\n");
}

#[test]
fn json_output_is_valid() {
    let result = JobResult::success(serde_json::json!({"area": 12.5}), BackendStatus::Completed);
    assert!(print_result(&JobId::from_string("job-1"), &result, OutputFormat::Json).is_ok());
}
